//! Public query API over an assembled trie + manifest (component D).
use std::collections::BTreeSet;

use crate::manifest::{Manifest, TagRecord};
use crate::trie::FrozenTrie;
use crate::trie_build::reversed_sentinel_path;

/// `(allow, deny)` list-id sets supplied by the caller. Absent means "no
/// user preference": any non-empty match blocks.
#[derive(Debug, Clone, Default)]
pub struct UserBitmap {
    pub allow: BTreeSet<u32>,
    pub deny: BTreeSet<u32>,
}

impl UserBitmap {
    pub fn new(allow: impl IntoIterator<Item = u32>, deny: impl IntoIterator<Item = u32>) -> Self {
        UserBitmap {
            allow: allow.into_iter().collect(),
            deny: deny.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub blocked: bool,
    pub matched_list_ids: BTreeSet<u32>,
    pub reason: String,
}

impl Verdict {
    fn not_blocked(reason: &str) -> Self {
        Verdict {
            blocked: false,
            matched_list_ids: BTreeSet::new(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateVerdict {
    pub blocked: bool,
    pub matched_list_ids: BTreeSet<u32>,
    pub per_name: Vec<(String, Verdict)>,
}

#[derive(Debug, Clone, Default)]
pub struct DomainInfo {
    pub list_ids: BTreeSet<u32>,
    pub tag_entries: Vec<(u32, TagRecord)>,
}

/// The assembled, queryable blocklist: a trie plus the file-tags manifest
/// describing what each list-id means. Immutable for its whole lifetime
/// (§3 Invariant 1); built once by [`crate::loader::BlocklistLoader`].
pub struct BlocklistFilter {
    trie: FrozenTrie,
    manifest: Manifest,
}

impl BlocklistFilter {
    pub fn new(trie: FrozenTrie, manifest: Manifest) -> Self {
        BlocklistFilter { trie, manifest }
    }

    /// Canonicalize (lowercase ASCII, strip one trailing dot) and validate a
    /// query name is non-empty. Non-ASCII bytes pass through unchanged —
    /// callers supply A-labels/punycode, per §8's IDN note.
    fn canonicalize(name: &str) -> Option<String> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_ascii_lowercase())
    }

    /// Evaluate `classify_name`'s 4.D lookup: walk the reversed,
    /// sentinel-joined label path one label at a time, remembering the
    /// deepest terminal node crossed — not merely the node the full string
    /// ends on, since a stored parent should still block even when a
    /// particular full child path is itself unstored.
    fn deepest_match(&self, canonical: &str) -> Option<Vec<u32>> {
        let path = reversed_sentinel_path(canonical);
        let mut cur = crate::trie::ROOT;
        let mut deepest_value: Option<Vec<u32>> = None;
        for &b in &path {
            match self.trie.step(cur, b) {
                Ok(Some(next)) => {
                    cur = next;
                    if self.trie.is_terminal(cur) {
                        if let Ok(v) = self.trie.value(cur) {
                            deepest_value = Some(v);
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
        deepest_value
    }

    pub fn classify_name(&self, name: &str, user_bitmap: Option<&UserBitmap>) -> Verdict {
        let canonical = match Self::canonicalize(name) {
            Some(c) => c,
            None => return Verdict::not_blocked("empty name"),
        };

        let matched = match self.deepest_match(&canonical) {
            Some(ids) => ids,
            None => return Verdict::not_blocked("no match"),
        };
        let matched: BTreeSet<u32> = matched.into_iter().collect();

        match user_bitmap {
            None => {
                let blocked = !matched.is_empty();
                Verdict {
                    blocked,
                    matched_list_ids: matched,
                    reason: if blocked { "matched list(s), no user bitmap".into() } else { "no match".into() },
                }
            }
            Some(bitmap) => {
                // matched_list_ids is the effective blocking set (S ∩ deny) \ allow,
                // not the raw S ∩ deny overlap — an allowed id stays out of the
                // reported match even though it was in both S and deny (§8 scenario 5).
                let effective: BTreeSet<u32> = matched
                    .intersection(&bitmap.deny)
                    .filter(|id| !bitmap.allow.contains(id))
                    .copied()
                    .collect();
                let blocked = !effective.is_empty();
                Verdict {
                    blocked,
                    matched_list_ids: effective,
                    reason: if blocked { "deny-wins match".into() } else { "allowed or no deny match".into() },
                }
            }
        }
    }

    pub fn classify_answers(
        &self,
        query_name: &str,
        answer_names: &[String],
        user_bitmap: Option<&UserBitmap>,
    ) -> AggregateVerdict {
        let mut agg = AggregateVerdict::default();

        let query_verdict = self.classify_name(query_name, user_bitmap);
        agg.blocked |= query_verdict.blocked;
        agg.matched_list_ids.extend(&query_verdict.matched_list_ids);
        agg.per_name.push((query_name.to_string(), query_verdict));

        for answer in answer_names {
            let verdict = self.classify_name(answer, user_bitmap);
            agg.blocked |= verdict.blocked;
            agg.matched_list_ids.extend(&verdict.matched_list_ids);
            agg.per_name.push((answer.clone(), verdict));
        }
        agg
    }

    /// Debug/inspection helper; never used on the hot path.
    pub fn lookup_domain_info(&self, name: &str) -> DomainInfo {
        let canonical = match Self::canonicalize(name) {
            Some(c) => c,
            None => return DomainInfo::default(),
        };
        let list_ids: BTreeSet<u32> = self.deepest_match(&canonical).unwrap_or_default().into_iter().collect();
        let tag_entries = list_ids
            .iter()
            .filter_map(|&id| self.manifest.get(id).map(|rec| (id, rec.clone())))
            .collect();
        DomainInfo { list_ids, tag_entries }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie_build;

    fn filter_from(entries: &[(&str, Vec<u32>)]) -> BlocklistFilter {
        let built: Vec<(Vec<u8>, Vec<u32>)> = entries
            .iter()
            .map(|(name, ids)| (trie_build::reversed_sentinel_path(name), ids.clone()))
            .collect();
        let (nodecount, bv) = trie_build::build_bitvector(&built).unwrap();
        let trie = FrozenTrie::new(bv, nodecount).unwrap();
        let manifest = Manifest::parse("{}").unwrap();
        BlocklistFilter::new(trie, manifest)
    }

    #[test]
    fn subdomain_inherits_parent_block() {
        let filter = filter_from(&[("example.com", vec![1])]);
        assert!(filter.classify_name("example.com", None).blocked);
        assert!(filter.classify_name("a.example.com", None).blocked);
        assert!(filter.classify_name("a.b.example.com", None).blocked);
        assert!(!filter.classify_name("example.co", None).blocked);
        assert!(!filter.classify_name("xample.com", None).blocked);
        assert!(!filter.classify_name("com", None).blocked);
    }

    #[test]
    fn unrelated_sibling_does_not_block() {
        let filter = filter_from(&[("b.c", vec![1])]);
        // "a.b.c" should still block via inheritance, but "b.c" alone must
        // only block because it is itself stored, not "c" alone.
        assert!(!filter.classify_name("c", None).blocked);
    }

    #[test]
    fn empty_blocklist_never_blocks() {
        let filter = filter_from(&[]);
        let verdict = filter.classify_name("anything.example", None);
        assert!(!verdict.blocked);
        assert!(verdict.matched_list_ids.is_empty());
    }

    #[test]
    fn deny_wins_over_allow_on_overlap() {
        // deny={5,42}, allow={42}, S={5,42}: 42 is both denied and allowed, so
        // allow wins for 42 specifically; only 5 remains as the effective match.
        let filter = filter_from(&[("ads.example.com", vec![5, 42])]);
        let bitmap = UserBitmap::new([42], [5, 42]);
        let verdict = filter.classify_name("ads.example.com", Some(&bitmap));
        assert!(verdict.blocked);
        assert_eq!(verdict.matched_list_ids, BTreeSet::from([5]));
    }

    #[test]
    fn allow_suppresses_block_when_deny_has_no_extra_ids() {
        let filter = filter_from(&[("ads.example.com", vec![42])]);
        let bitmap = UserBitmap::new([42], [42]);
        let verdict = filter.classify_name("ads.example.com", Some(&bitmap));
        assert!(!verdict.blocked);
    }

    #[test]
    fn classify_answers_blocks_if_any_name_blocks() {
        let filter = filter_from(&[("bad.example", vec![1])]);
        let agg = filter.classify_answers(
            "good.example",
            &["also-good.example".to_string(), "bad.example".to_string()],
            None,
        );
        assert!(agg.blocked);
        assert_eq!(agg.per_name.len(), 3);
    }

    #[test]
    fn name_canonicalization_is_case_and_trailing_dot_insensitive() {
        let filter = filter_from(&[("example.com", vec![1])]);
        assert!(filter.classify_name("EXAMPLE.com.", None).blocked);
    }

    #[test]
    fn lookup_domain_info_reports_list_ids() {
        let filter = filter_from(&[("example.com", vec![1])]);
        let info = filter.lookup_domain_info("example.com");
        assert_eq!(info.list_ids, BTreeSet::from([1]));
    }

    fn random_domain(rng: &mut impl rand::Rng) -> String {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let label_count = rng.gen_range(2..=4);
        (0..label_count)
            .map(|_| {
                let len = rng.gen_range(3..=12);
                (0..len)
                    .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    #[test]
    fn ten_thousand_random_domains_round_trip_with_no_false_positives() {
        use rand::Rng;
        use std::collections::HashSet;

        let mut rng = rand::thread_rng();
        let mut stored: HashSet<String> = HashSet::new();
        while stored.len() < 10_000 {
            stored.insert(random_domain(&mut rng));
        }

        let entries: Vec<(&str, Vec<u32>)> = stored.iter().map(|d| (d.as_str(), vec![1])).collect();
        let filter = filter_from(&entries);

        for domain in &stored {
            assert!(filter.classify_name(domain, None).blocked, "{} should be blocked", domain);
        }

        let mut checked = 0;
        while checked < 10_000 {
            let candidate = random_domain(&mut rng);
            if stored.contains(&candidate) {
                continue;
            }
            assert!(
                !filter.classify_name(&candidate, None).blocked,
                "{} is not a stored domain or subdomain of one but was blocked",
                candidate
            );
            checked += 1;
        }
    }
}
