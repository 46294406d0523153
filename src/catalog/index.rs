//! Token index over a catalog snapshot.
//!
//! Each record contributes three token families:
//!
//! - every prefix of its code,
//! - every substring of its lower-cased name up to [`MAX_NAME_TOKEN_CHARS`]
//!   characters,
//! - every prefix of its upper-cased phonetic abbreviation.
//!
//! Postings hold snapshot slots rather than codes, so an index is only
//! meaningful next to the snapshot it was built from. Postings are sorted and
//! free of duplicates because records are visited in slot order.

use super::snapshot::CatalogSnapshot;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::info;

/// Longest name substring that gets its own token.
pub const MAX_NAME_TOKEN_CHARS: usize = 9;

#[derive(Debug, Default)]
pub struct InvertedIndex {
    tokens: BTreeMap<Box<str>, Vec<u32>>,
    postings: usize,
}

impl InvertedIndex {
    pub fn get(&self, token: &str) -> Option<&[u32]> {
        self.tokens.get(token).map(Vec::as_slice)
    }

    /// Postings of every token containing `needle`, compared case-insensitively.
    /// `needle_lower` and `needle_upper` are the case-folded forms of the same
    /// keyword; name tokens are stored lower-cased and phonetic tokens
    /// upper-cased, so no per-key folding is needed.
    pub fn tokens_containing<'a>(
        &'a self,
        needle_lower: &'a str,
        needle_upper: &'a str,
    ) -> impl Iterator<Item = &'a [u32]> + 'a {
        self.tokens
            .iter()
            .filter(move |(token, _)| token.contains(needle_lower) || token.contains(needle_upper))
            .map(|(_, slots)| slots.as_slice())
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn posting_count(&self) -> usize {
        self.postings
    }

    fn add(&mut self, token: &str, slot: u32) {
        match self.tokens.get_mut(token) {
            Some(slots) => {
                if slots.last() != Some(&slot) {
                    slots.push(slot);
                    self.postings += 1;
                }
            }
            None => {
                self.tokens.insert(token.into(), vec![slot]);
                self.postings += 1;
            }
        }
    }

    fn add_prefixes(&mut self, text: &str, slot: u32) {
        for (end, ch) in text.char_indices() {
            self.add(&text[..end + ch.len_utf8()], slot);
        }
    }

    fn add_substrings(&mut self, text: &str, slot: u32) {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let chars = bounds.len() - 1;

        for start in 0..chars {
            let last = chars.min(start + MAX_NAME_TOKEN_CHARS);
            for end in start + 1..=last {
                self.add(&text[bounds[start]..bounds[end]], slot);
            }
        }
    }
}

/// Exact code to snapshot slot.
#[derive(Debug, Default)]
pub struct CodeLookupTable {
    slots: HashMap<Box<str>, u32>,
}

impl CodeLookupTable {
    pub fn get(&self, code: &str) -> Option<usize> {
        self.slots.get(code).map(|&slot| slot as usize)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    pub records: usize,
    pub tokens: usize,
    pub postings: usize,
    pub elapsed: Duration,
}

/// Builds the index and lookup table for `snapshot`. Both are produced
/// together and must only ever be used together with that snapshot.
pub fn build_index(snapshot: &CatalogSnapshot) -> (InvertedIndex, CodeLookupTable, IndexStats) {
    let started = Instant::now();
    let mut index = InvertedIndex::default();
    let mut lookup = CodeLookupTable {
        slots: HashMap::with_capacity(snapshot.len()),
    };

    for (slot, record) in snapshot.records().iter().enumerate() {
        let slot = slot as u32;
        lookup.slots.insert(record.code.as_str().into(), slot);

        index.add_prefixes(&record.code, slot);
        if !record.name.is_empty() {
            index.add_substrings(&record.name.to_lowercase(), slot);
        }
        if !record.phonetic_abbreviation.is_empty() {
            index.add_prefixes(&record.phonetic_abbreviation, slot);
        }
    }

    let stats = IndexStats {
        records: snapshot.len(),
        tokens: index.token_count(),
        postings: index.posting_count(),
        elapsed: started.elapsed(),
    };
    info!(
        records = stats.records,
        tokens = stats.tokens,
        postings = stats.postings,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "Built fund search index"
    );

    (index, lookup, stats)
}
