//! Constructive counterpart to [`crate::trie`] (§10.7): builds a `(nodecount,
//! td_bytes, rd_bytes)` triple from a plain list of `(domain, list_ids)`
//! pairs, honoring the exact bit layout [`crate::trie::FrozenTrie`] decodes.
//! No producer for the real artifact format ships with this repository, so
//! this is the only way to get a self-consistent fixture for round-trip and
//! property tests; it is not part of the public query path.
use std::collections::BTreeMap;

use crate::bitvector::BitVector;
use crate::error::{BlocklistError, Result};
use crate::tagcodec;

const CHILD_SLOT_BITS: usize = 9;
const SENTINEL: u8 = 0x00;

#[derive(Default)]
struct BuildNode {
    children: BTreeMap<u8, BuildNode>,
    list_ids: Option<Vec<u32>>,
}

impl BuildNode {
    fn insert(&mut self, labels: &[u8], list_ids: Vec<u32>) {
        match labels.split_first() {
            None => self.list_ids = Some(list_ids),
            Some((&b, rest)) => self.children.entry(b).or_default().insert(rest, list_ids),
        }
    }
}

/// Build a trie blob from `entries`: each is a reversed, sentinel-joined
/// domain label sequence (see [`reversed_sentinel_path`]) and its list-id
/// set. Returns `(nodecount, td_bytes, td_len_bits, rd_bytes)`.
pub fn build(entries: &[(Vec<u8>, Vec<u32>)]) -> Result<(u64, Vec<u8>, usize, Vec<u8>)> {
    let mut root = BuildNode::default();
    for (labels, list_ids) in entries {
        let mut sorted = list_ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        root.insert(labels, sorted);
    }

    // BFS flatten so node ids are assigned in the order FrozenTrie expects.
    let mut order: Vec<&BuildNode> = vec![&root];
    let mut queue: std::collections::VecDeque<&BuildNode> = std::collections::VecDeque::new();
    queue.push_back(&root);
    while let Some(node) = queue.pop_front() {
        for child in node.children.values() {
            order.push(child);
            queue.push_back(child);
        }
    }
    let nodecount = order.len() as u64;
    if nodecount > (1u64 << 32) {
        return Err(BlocklistError::assembly("too many nodes to encode"));
    }

    let mut bits = Vec::new();
    for node in &order {
        let degree = node.children.len();
        for _ in 0..degree {
            bits.push(true);
        }
        bits.push(false);
    }
    let region1_len = bits.len();
    debug_assert_eq!(region1_len, 2 * order.len() - 1);

    for node in &order {
        for (&label, child) in node.children.iter() {
            let terminal = child.list_ids.is_some();
            push_bits(&mut bits, ((label as u64) << 1) | terminal as u64, CHILD_SLOT_BITS);
        }
    }

    for node in &order {
        if let Some(ids) = &node.list_ids {
            bits.extend(tagcodec::encode(ids));
        }
    }

    let len_bits = bits.len();
    let mut bytes = vec![0u8; (len_bits + 7) / 8];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    let rd_bytes = BitVector::new(bytes.clone(), len_bits).rank_directory_bytes();
    Ok((nodecount, bytes, len_bits, rd_bytes))
}

/// Convenience wrapper for tests: build the trie and immediately assemble it
/// into a ready-to-use [`BitVector`] via [`BitVector::from_parts`], matching
/// what `BlocklistLoader` does with network-fetched bytes.
pub fn build_bitvector(entries: &[(Vec<u8>, Vec<u32>)]) -> Result<(u64, BitVector)> {
    let (nodecount, bytes, len_bits, rd_bytes) = build(entries)?;
    let bv = BitVector::from_parts(bytes, len_bits, &rd_bytes)?;
    Ok((nodecount, bv))
}

fn push_bits(bits: &mut Vec<bool>, value: u64, width: usize) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

/// Join a reversed domain, separating labels with the `0x00` sentinel.
/// Kept here (rather than only in `filter`) since the builder needs the same
/// convention to produce fixtures `FrozenTrie`/`BlocklistFilter` agree on.
pub fn reversed_sentinel_path(domain: &str) -> Vec<u8> {
    let mut labels: Vec<&str> = domain.split('.').collect();
    labels.reverse();
    let mut out = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            out.push(SENTINEL);
        }
        out.extend_from_slice(label.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::FrozenTrie;

    #[test]
    fn single_domain_round_trips() {
        let entries = vec![(reversed_sentinel_path("example.com"), vec![1, 2])];
        let (nodecount, bv) = build_bitvector(&entries).unwrap();
        let trie = FrozenTrie::new(bv, nodecount).unwrap();
        let node = trie.lookup(&reversed_sentinel_path("example.com")).unwrap();
        assert!(node.is_some());
        assert_eq!(trie.value(node.unwrap()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn sibling_domains_share_a_root() {
        let entries = vec![
            (reversed_sentinel_path("example.com"), vec![1]),
            (reversed_sentinel_path("example.org"), vec![2]),
        ];
        let (nodecount, bv) = build_bitvector(&entries).unwrap();
        let trie = FrozenTrie::new(bv, nodecount).unwrap();
        let com = trie.lookup(&reversed_sentinel_path("example.com")).unwrap().unwrap();
        let org = trie.lookup(&reversed_sentinel_path("example.org")).unwrap().unwrap();
        assert_eq!(trie.value(com).unwrap(), vec![1]);
        assert_eq!(trie.value(org).unwrap(), vec![2]);
    }

    #[test]
    fn subdomain_does_not_match_unstored_parent() {
        let entries = vec![(reversed_sentinel_path("a.example.com"), vec![9])];
        let (nodecount, bv) = build_bitvector(&entries).unwrap();
        let trie = FrozenTrie::new(bv, nodecount).unwrap();
        assert!(trie.lookup(&reversed_sentinel_path("example.com")).unwrap().is_none());
        assert!(trie
            .lookup(&reversed_sentinel_path("a.example.com"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn rank_directory_round_trips_through_from_parts() {
        let entries = vec![(reversed_sentinel_path("x.y.z"), vec![7])];
        let (nodecount, bytes, len_bits, rd_bytes) = build(&entries).unwrap();
        let bv = BitVector::from_parts(bytes, len_bits, &rd_bytes).unwrap();
        let trie = FrozenTrie::new(bv, nodecount).unwrap();
        assert!(trie.lookup(&reversed_sentinel_path("x.y.z")).unwrap().is_some());
    }
}
