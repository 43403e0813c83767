//! Variable-length encoding of a per-domain list-ID set (component C).
//!
//! A set of list-IDs is written as ascending, delta-coded integers. Each
//! delta is a sequence of 7-bit words: 6 payload bits (little-endian, least
//! significant first) plus a continuation bit set on every word but the
//! last. An 8-bit count up front tells the decoder how many deltas follow
//! (SPEC_FULL.md §9 — the node-header-declares-the-count resolution of
//! §4.C's ambiguity).
use crate::bitvector::BitVector;
use crate::error::{BlocklistError, Result};

const PAYLOAD_BITS: usize = 6;
const WORD_BITS: usize = PAYLOAD_BITS + 1;
const CONTINUATION_BIT: u32 = 1 << PAYLOAD_BITS;
const PAYLOAD_MASK: u32 = (1 << PAYLOAD_BITS) - 1;
pub const COUNT_BITS: usize = 8;
const MAX_DELTAS: u32 = (1 << COUNT_BITS) - 1;

/// Encode an ascending, deduplicated set of list-IDs into a bit sequence:
/// an 8-bit count followed by that many delta-coded values.
pub fn encode(list_ids: &[u32]) -> Vec<bool> {
    assert!(
        list_ids.len() as u32 <= MAX_DELTAS,
        "too many list ids for an 8-bit count: {}",
        list_ids.len()
    );
    let mut bits = Vec::new();
    push_bits(&mut bits, list_ids.len() as u32, COUNT_BITS);

    let mut prev = 0u32;
    for (i, &id) in list_ids.iter().enumerate() {
        let delta = if i == 0 { id } else { id - prev };
        encode_varint(&mut bits, delta);
        prev = id;
    }
    bits
}

fn encode_varint(bits: &mut Vec<bool>, mut value: u32) {
    loop {
        let word = value & PAYLOAD_MASK;
        value >>= PAYLOAD_BITS;
        let more = value != 0;
        let word = if more { word | CONTINUATION_BIT } else { word };
        push_bits(bits, word, WORD_BITS);
        if !more {
            break;
        }
    }
}

fn push_bits(bits: &mut Vec<bool>, value: u32, width: usize) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

/// Decode a list-ID set starting at bit offset `start` in `bv`. Returns the
/// decoded, ascending list of IDs and the bit offset immediately following
/// the encoded value (useful for sequentially skipping records).
pub fn decode(bv: &BitVector, start: usize) -> Result<(Vec<u32>, usize)> {
    let mut pos = start;
    let count = bv.chunk(pos, COUNT_BITS) as u32;
    pos += COUNT_BITS;

    let mut ids = Vec::with_capacity(count as usize);
    let mut running = 0u32;
    for _ in 0..count {
        let (delta, next_pos) = decode_varint(bv, pos)?;
        running = running
            .checked_add(delta)
            .ok_or_else(|| BlocklistError::trie_format("list-id delta overflow"))?;
        ids.push(running);
        pos = next_pos;
    }
    Ok((ids, pos))
}

/// Skip a record without decoding it, returning the bit offset right after
/// it. Used to step over the records of terminal nodes that are not the one
/// being looked up (see `FrozenTrie::value`).
pub fn skip(bv: &BitVector, start: usize) -> Result<usize> {
    let mut pos = start;
    let count = bv.chunk(pos, COUNT_BITS) as u32;
    pos += COUNT_BITS;
    for _ in 0..count {
        let (_, next_pos) = decode_varint(bv, pos)?;
        pos = next_pos;
    }
    Ok(pos)
}

fn decode_varint(bv: &BitVector, start: usize) -> Result<(u32, usize)> {
    let mut pos = start;
    let mut value: u32 = 0;
    let mut shift = 0u32;
    loop {
        if pos + WORD_BITS > bv.len() {
            return Err(BlocklistError::trie_format("truncated tagcodec word"));
        }
        let word = bv.chunk(pos, WORD_BITS) as u32;
        pos += WORD_BITS;
        let payload = word & PAYLOAD_MASK;
        value |= payload << shift;
        shift += PAYLOAD_BITS as u32;
        if word & CONTINUATION_BIT == 0 {
            break;
        }
        if shift >= 32 {
            return Err(BlocklistError::trie_format("tagcodec value too wide"));
        }
    }
    Ok((value, pos))
}
