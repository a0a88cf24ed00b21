//! Decomposes a code-point range into a set of UTF-8 byte-range sequences, then builds an NFA
//! gadget from them that shares tail states between adjacent sequences, the way a trie keyed on
//! reversed byte strings would. Normalization, grapheme clustering, and anything else beyond
//! "which bytes can this range start with" is out of scope here; see the module's caller for that
//! boundary.

use std::collections::{BTreeSet, HashMap};

use crate::anno::AnnotatedFsa;
use crate::fsa::{EdgeLabel, Fsa, StateId};
use crate::label::{Label, Tag};

const SURROGATE_LO: u32 = 0xD800;
const SURROGATE_HI: u32 = 0xDFFF;

fn exclude_surrogates(lo: u32, hi: u32) -> Vec<(u32, u32)> {
    if hi < SURROGATE_LO || lo > SURROGATE_HI {
        return vec![(lo, hi)];
    }
    let mut out = Vec::new();
    if lo < SURROGATE_LO {
        out.push((lo, SURROGATE_LO - 1));
    }
    if hi > SURROGATE_HI {
        out.push((SURROGATE_HI + 1, hi));
    }
    out
}

fn length_classes(lo: u32, hi: u32) -> Vec<(u32, u32, usize)> {
    const BOUNDS: [(u32, u32, usize); 4] =
        [(0x0000, 0x007F, 1), (0x0080, 0x07FF, 2), (0x0800, 0xFFFF, 3), (0x1_0000, 0x10_FFFF, 4)];
    BOUNDS
        .iter()
        .filter_map(|&(blo, bhi, len)| {
            let l = lo.max(blo);
            let h = hi.min(bhi);
            if l <= h {
                Some((l, h, len))
            } else {
                None
            }
        })
        .collect()
}

fn encode(cp: u32, len: usize) -> Vec<u8> {
    match len {
        1 => vec![cp as u8],
        2 => vec![0xC0 | (cp >> 6) as u8, 0x80 | (cp & 0x3F) as u8],
        3 => vec![0xE0 | (cp >> 12) as u8, 0x80 | ((cp >> 6) & 0x3F) as u8, 0x80 | (cp & 0x3F) as u8],
        4 => vec![
            0xF0 | (cp >> 18) as u8,
            0x80 | ((cp >> 12) & 0x3F) as u8,
            0x80 | ((cp >> 6) & 0x3F) as u8,
            0x80 | (cp & 0x3F) as u8,
        ],
        _ => unreachable!("UTF-8 sequences are 1 to 4 bytes"),
    }
}

/// Splits the byte-range sequence `[lo_bytes, hi_bytes]` (same length, `mins`/`maxs` giving the
/// full allowed range at each position) into the minimal set of rectangular byte-range sequences
/// whose union covers exactly the lexicographic range `[lo_bytes, hi_bytes]`.
fn split(lo_bytes: &[u8], hi_bytes: &[u8], mins: &[u8], maxs: &[u8]) -> Vec<Vec<(u8, u8)>> {
    if lo_bytes.len() == 1 {
        return vec![vec![(lo_bytes[0], hi_bytes[0])]];
    }
    let (lo0, hi0) = (lo_bytes[0], hi_bytes[0]);
    if lo0 == hi0 {
        return split(&lo_bytes[1..], &hi_bytes[1..], &mins[1..], &maxs[1..])
            .into_iter()
            .map(|mut seq| {
                seq.insert(0, (lo0, lo0));
                seq
            })
            .collect();
    }
    let mut out = Vec::new();
    let lo_rest_max: Vec<u8> = maxs[1..].to_vec();
    out.extend(split(&lo_bytes[1..], &lo_rest_max, &mins[1..], &maxs[1..]).into_iter().map(|mut seq| {
        seq.insert(0, (lo0, lo0));
        seq
    }));
    if lo0 + 1 < hi0 {
        let mut mid = vec![(lo0 + 1, hi0 - 1)];
        mid.extend(mins[1..].iter().zip(&maxs[1..]).map(|(&a, &b)| (a, b)));
        out.push(mid);
    }
    let hi_rest_min: Vec<u8> = mins[1..].to_vec();
    out.extend(split(&hi_rest_min, &hi_bytes[1..], &mins[1..], &maxs[1..]).into_iter().map(|mut seq| {
        seq.insert(0, (hi0, hi0));
        seq
    }));
    out
}

/// Every byte-range sequence whose language (as a regular set of byte strings) is exactly the
/// UTF-8 encodings of the code points in `[lo, hi]`.
fn byte_sequences(lo: u32, hi: u32) -> Vec<Vec<(u8, u8)>> {
    let mut out = Vec::new();
    for (l, h) in exclude_surrogates(lo, hi) {
        for (cl, ch, len) in length_classes(l, h) {
            let lo_bytes = encode(cl, len);
            let hi_bytes = encode(ch, len);
            let mins = vec![0x80u8; len];
            let maxs = vec![0xBFu8; len];
            out.extend(split(&lo_bytes, &hi_bytes, &mins, &maxs));
        }
    }
    out
}

fn build_suffix(
    fsa: &mut Fsa,
    memo: &mut HashMap<Vec<(u8, u8)>, StateId>,
    seq: &[(u8, u8)],
    pos: usize,
    final_state: StateId,
) -> StateId {
    if pos == seq.len() {
        return final_state;
    }
    let key: Vec<(u8, u8)> = seq[pos..].to_vec();
    if let Some(&id) = memo.get(&key) {
        return id;
    }
    let next = build_suffix(fsa, memo, seq, pos + 1, final_state);
    let id = fsa.adj.len();
    fsa.adj.push(Vec::new());
    let (lo, hi) = seq[pos];
    fsa.adj[id].push((EdgeLabel::Range(lo as Label, hi as Label + 1), next));
    memo.insert(key, id);
    id
}

/// Builds the annotated gadget for `lo..=hi` (inclusive code-point range). Identical suffixes
/// across different byte sequences collapse onto the same state, since `memo` is keyed on the
/// remaining suffix rather than on the sequence's identity; there's no separate reference-counting
/// step needed, as a shared suffix is just one arena slot referenced by multiple predecessors.
pub fn utf8_range_nfa<T: Ord + Copy>(lo: u32, hi: u32, expr: T) -> AnnotatedFsa<T> {
    let sequences = byte_sequences(lo, hi);
    let mut fsa = Fsa::default();
    let final_state = fsa.adj.len();
    fsa.adj.push(Vec::new());
    let mut memo = HashMap::new();
    let entry_points: BTreeSet<StateId> =
        sequences.iter().map(|seq| build_suffix(&mut fsa, &mut memo, seq, 0, final_state)).collect();
    let start = fsa.adj.len();
    fsa.adj.push(entry_points.iter().map(|&s| (EdgeLabel::Epsilon, s)).collect());
    fsa.adj[start].sort();
    fsa.start = start;
    fsa.finals = vec![final_state];

    let n = fsa.adj.len();
    let mut assoc = vec![Vec::new(); n];
    assoc[start].push((expr, Tag::START));
    assoc[final_state].push((expr, Tag::FINAL));
    for (s, slot) in assoc.iter_mut().enumerate() {
        if s != start && s != final_state {
            slot.push((expr, Tag::INNER));
        }
    }
    AnnotatedFsa { fsa, assoc, deterministic: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts_bytes(fsa: &Fsa, bytes: &[u8]) -> bool {
        let mut current = fsa.epsilon_closure(&[fsa.start]);
        for &b in bytes {
            let mut next = Vec::new();
            for &u in &current {
                for &(label, v) in &fsa.adj[u] {
                    if let EdgeLabel::Range(lo, hi) = label {
                        if lo <= b as Label && (b as Label) < hi {
                            next.push(v);
                        }
                    }
                }
            }
            current = fsa.epsilon_closure(&next);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&u| fsa.is_final(u))
    }

    #[test]
    fn encode_matches_known_code_points() {
        assert_eq!(encode('$' as u32, 1), vec![0x24]);
        assert_eq!(encode(0xA2, 2), vec![0xC2, 0xA2]); // cent sign
        assert_eq!(encode(0x20AC, 3), vec![0xE2, 0x82, 0xAC]); // euro sign
        assert_eq!(encode(0x10348, 4), vec![0xF0, 0x90, 0x8D, 0x88]); // gothic letter hwair
    }

    #[test]
    fn single_code_point_round_trips_through_nfa() {
        for &cp in &[0x24u32, 0xA2, 0x20AC, 0x10348] {
            let s = char::from_u32(cp).unwrap().to_string();
            let gadget = utf8_range_nfa(cp, cp, 0u32);
            assert!(accepts_bytes(&gadget.fsa, s.as_bytes()), "code point {:#x}", cp);
        }
    }

    #[test]
    fn range_rejects_bytes_outside_it() {
        let gadget = utf8_range_nfa('a' as u32, 'z' as u32, 0u32);
        assert!(accepts_bytes(&gadget.fsa, b"m"));
        assert!(!accepts_bytes(&gadget.fsa, b"A"));
        assert!(!accepts_bytes(&gadget.fsa, "\u{20AC}".as_bytes()));
    }

    #[test]
    fn surrogate_range_is_excluded() {
        let sequences = byte_sequences(SURROGATE_LO - 1, SURROGATE_HI + 1);
        // the range straddling the surrogate block splits into two pieces that exclude it
        let total_code_points: u64 = sequences
            .iter()
            .map(|seq| seq.iter().map(|&(lo, hi)| (hi - lo + 1) as u64).product::<u64>())
            .sum();
        assert_eq!(total_code_points, 2);
    }

    #[test]
    fn build_suffix_reuses_identical_tails() {
        // Two distinct sequences sharing the same remaining suffix after the first byte must
        // collapse onto the same arena state, rather than each getting its own copy.
        let mut fsa = Fsa::default();
        let final_state = fsa.adj.len();
        fsa.adj.push(Vec::new());
        let mut memo = HashMap::new();
        let shared_tail = [(0x80u8, 0x80u8)];
        let seq_a: Vec<(u8, u8)> = [(0xC2u8, 0xC2u8)].iter().chain(&shared_tail).copied().collect();
        let seq_b: Vec<(u8, u8)> = [(0xC3u8, 0xC3u8)].iter().chain(&shared_tail).copied().collect();
        let entry_a = build_suffix(&mut fsa, &mut memo, &seq_a, 0, final_state);
        let entry_b = build_suffix(&mut fsa, &mut memo, &seq_b, 0, final_state);
        assert_ne!(entry_a, entry_b, "the first, differing byte still needs separate states");
        // but the tail state reached after consuming each sequence's first byte is shared.
        let tail_a = fsa.adj[entry_a][0].1;
        let tail_b = fsa.adj[entry_b][0].1;
        assert_eq!(tail_a, tail_b);
    }
}
