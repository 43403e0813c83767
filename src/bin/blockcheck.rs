//! A small CLI for exercising a [`dohblock::BlocklistFilter`] end to end,
//! grounded in the teacher crate's `dnsquery` binary: a `clap::App` for
//! argument parsing and a `DisplayWrapper` for rendering results.
//!
//! The real CDN artifacts are out of scope for a test-only repository, so
//! this builds its filter from local fixture files (`--td`, `--rd`,
//! `--filetag`, `--nodecount`) rather than fetching over the network.
use std::fmt;
use std::fs;
use std::process::ExitCode;

use clap::{App, Arg};

use dohblock::bitvector::BitVector;
use dohblock::filter::{BlocklistFilter, UserBitmap, Verdict};
use dohblock::manifest::Manifest;
use dohblock::trie::FrozenTrie;
use dohblock::Result;

struct CliOptions {
    td_path: String,
    rd_path: String,
    filetag_path: String,
    nodecount: u64,
    domains: Vec<String>,
    allow: Vec<u32>,
    deny: Vec<u32>,
    debug: bool,
}

impl CliOptions {
    fn parse() -> Self {
        let matches = App::new("blockcheck")
            .version("0.1")
            .about("Classify domains against a locally-fetched blocklist trie")
            .arg(
                Arg::new("td")
                    .long("td")
                    .required(true)
                    .long_help("Path to the assembled td blob")
                    .takes_value(true),
            )
            .arg(
                Arg::new("rd")
                    .long("rd")
                    .required(true)
                    .long_help("Path to the rd.txt rank directory")
                    .takes_value(true),
            )
            .arg(
                Arg::new("filetag")
                    .long("filetag")
                    .required(true)
                    .long_help("Path to filetag.json")
                    .takes_value(true),
            )
            .arg(
                Arg::new("nodecount")
                    .long("nodecount")
                    .required(true)
                    .long_help("Declared trie node count")
                    .takes_value(true),
            )
            .arg(
                Arg::new("domain")
                    .short('d')
                    .long("domain")
                    .required(true)
                    .multiple_occurrences(true)
                    .long_help("Domain(s) to classify")
                    .takes_value(true),
            )
            .arg(
                Arg::new("allow")
                    .long("allow")
                    .long_help("Comma-separated list-ids the user allows")
                    .takes_value(true),
            )
            .arg(
                Arg::new("deny")
                    .long("deny")
                    .long_help("Comma-separated list-ids the user denies")
                    .takes_value(true),
            )
            .arg(
                Arg::new("debug")
                    .short('g')
                    .long("debug")
                    .required(false)
                    .long_help("Debug mode")
                    .takes_value(false),
            )
            .get_matches();

        let parse_ids = |value: Option<&str>| -> Vec<u32> {
            value
                .unwrap_or("")
                .split(',')
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        };

        CliOptions {
            td_path: matches.value_of("td").unwrap().to_string(),
            rd_path: matches.value_of("rd").unwrap().to_string(),
            filetag_path: matches.value_of("filetag").unwrap().to_string(),
            nodecount: matches.value_of("nodecount").unwrap().parse().unwrap_or(0),
            domains: matches.values_of("domain").unwrap().map(String::from).collect(),
            allow: parse_ids(matches.value_of("allow")),
            deny: parse_ids(matches.value_of("deny")),
            debug: matches.is_present("debug"),
        }
    }
}

struct DisplayWrapper<'a, T>(&'a T);

impl fmt::Display for DisplayWrapper<'_, Verdict> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocked:{} reason:\"{}\" matched:{:?}", self.0.blocked, self.0.reason, self.0.matched_list_ids)
    }
}

fn load_filter(options: &CliOptions) -> Result<BlocklistFilter> {
    let td_bytes = fs::read(&options.td_path)?;
    let rd_bytes = fs::read(&options.rd_path)?;
    let filetag_json = fs::read_to_string(&options.filetag_path)?;

    let td_len_bits = td_bytes.len() * 8;
    let bv = BitVector::from_parts(td_bytes, td_len_bits, &rd_bytes)?;
    let trie = FrozenTrie::new(bv, options.nodecount)?;
    let manifest = Manifest::parse(&filetag_json)?;
    Ok(BlocklistFilter::new(trie, manifest))
}

fn main() -> ExitCode {
    env_logger::init();
    let options = CliOptions::parse();

    if options.debug {
        eprintln!("td={} rd={} filetag={} nodecount={}", options.td_path, options.rd_path, options.filetag_path, options.nodecount);
    }

    let filter = match load_filter(&options) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("failed to build blocklist filter: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let bitmap = if options.allow.is_empty() && options.deny.is_empty() {
        None
    } else {
        Some(UserBitmap::new(options.allow.clone(), options.deny.clone()))
    };

    for domain in &options.domains {
        let verdict = filter.classify_name(domain, bitmap.as_ref());
        println!("{}: {}", domain, DisplayWrapper(&verdict));
    }

    ExitCode::SUCCESS
}
