//! Configuration consumed by [`crate::loader::BlocklistLoader`] and
//! [`crate::wrapper::BlocklistWrapper`]. The host process owns *how* this
//! struct gets populated (env vars, a config file, CLI flags); this module
//! only owns the struct, its defaults, and a small env-override merge step.
use serde::{Deserialize, Serialize};

const DEFAULT_BLOCKLIST_URL: &str = "https://dist.rethinkdns.com/blocklists/";
const DEFAULT_TIMESTAMP: &str = "1690875908512";
const DEFAULT_DOWNLOAD_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 14 * 24 * 3_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub blocklist_url: String,
    pub latest_timestamp: String,
    pub td_nodecount: u64,
    pub td_parts: i32,
    pub download_timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocklist_url: DEFAULT_BLOCKLIST_URL.to_string(),
            latest_timestamp: DEFAULT_TIMESTAMP.to_string(),
            td_nodecount: 0,
            td_parts: -1,
            download_timeout_ms: DEFAULT_DOWNLOAD_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl Config {
    /// Base URL for this config's timestamped bundle, e.g.
    /// `https://dist.rethinkdns.com/blocklists/1690875908512`.
    pub fn base_url(&self) -> String {
        format!(
            "{}{}",
            self.blocklist_url.trim_end_matches('/'),
            format_args!("/{}", self.latest_timestamp)
        )
    }

    pub fn download_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.download_timeout_ms)
    }

    /// Overlay a handful of environment variables on top of `self`, mutating
    /// in place. Reading the environment itself is a host concern (see the
    /// crate's Non-goals); this just knows which variable names matter and
    /// how to apply them once handed their values.
    pub fn apply_env_overrides<F>(&mut self, getenv: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = getenv("DOH_BLOCKLIST_URL") {
            self.blocklist_url = v;
        }
        if let Some(v) = getenv("DOH_LATEST_TIMESTAMP") {
            self.latest_timestamp = v;
        }
        if let Some(v) = getenv("DOH_TD_NODECOUNT").and_then(|s| s.parse().ok()) {
            self.td_nodecount = v;
        }
        if let Some(v) = getenv("DOH_TD_PARTS").and_then(|s| s.parse().ok()) {
            self.td_parts = v;
        }
        if let Some(v) = getenv("DOH_DOWNLOAD_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.download_timeout_ms = v;
        }
        if let Some(v) = getenv("DOH_CACHE_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.cache_ttl_secs = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.blocklist_url, DEFAULT_BLOCKLIST_URL);
        assert_eq!(cfg.td_parts, -1);
        assert_eq!(cfg.download_timeout_ms, 5_000);
    }

    #[test]
    fn base_url_joins_timestamp() {
        let cfg = Config::default();
        assert_eq!(
            cfg.base_url(),
            "https://dist.rethinkdns.com/blocklists/1690875908512"
        );
    }

    #[test]
    fn env_overrides_apply_only_present_vars() {
        let mut cfg = Config::default();
        cfg.apply_env_overrides(|key| match key {
            "DOH_LATEST_TIMESTAMP" => Some("99".to_string()),
            "DOH_DOWNLOAD_TIMEOUT_MS" => Some("9000".to_string()),
            _ => None,
        });
        assert_eq!(cfg.latest_timestamp, "99");
        assert_eq!(cfg.download_timeout_ms, 9000);
        assert_eq!(cfg.blocklist_url, DEFAULT_BLOCKLIST_URL);
    }
}
