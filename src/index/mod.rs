//! Keyword search over gallery items.
//!
//! Items are indexed under each of their keywords in a prefix trie. A query
//! is a list of words; every word is a prefix search and the result is the
//! intersection of the per-word hits. Keywords and query words are compared
//! lowercased.

pub mod shard;
pub mod trie;

pub use shard::{shard, shard_key, Shard, ShardLoader, ShardedIndex, SHARD_COUNT};
pub use trie::KeywordTrie;

use crate::{Error, GalleryItem, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// In-memory keyword index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryIndex {
    trie: KeywordTrie,
}

impl GalleryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I: IntoIterator<Item = GalleryItem>>(items: I) -> Self {
        let mut index = Self::new();
        for item in items {
            index.add(item);
        }
        index
    }

    /// Index `item` under each of its keywords
    pub fn add(&mut self, item: GalleryItem) {
        for keyword in normalize_words(&item.keywords) {
            self.trie.insert(&keyword, item.clone());
        }
    }

    /// Items matching every word of `words`, de-duplicated, in the order the
    /// first word's search yields them. No words means no results.
    pub fn query<S: AsRef<str>>(&self, words: &[S]) -> Vec<GalleryItem> {
        let words = normalize_words(words);
        let per_word = words.iter().map(|w| {
            let hits = self.trie.search(w);
            log::debug!("found {} results for '{}'", hits.len(), w);
            hits
        });
        intersect(per_word)
    }

    /// Split a free-text query on whitespace and run it
    pub fn query_str(&self, query: &str) -> Vec<GalleryItem> {
        let words: Vec<&str> = query.split_whitespace().collect();
        self.query(&words)
    }

    pub fn trie(&self) -> &KeywordTrie {
        &self.trie
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Index(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }
}

/// Lowercase, trim and drop empty words
pub(crate) fn normalize_words<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Intersection of several hit lists, keeping the first list's order
pub(crate) fn intersect<I>(lists: I) -> Vec<GalleryItem>
where
    I: IntoIterator<Item = Vec<GalleryItem>>,
{
    let mut lists = lists.into_iter();
    let Some(first) = lists.next() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut result: Vec<GalleryItem> =
        first.into_iter().filter(|i| seen.insert(i.clone())).collect();
    for list in lists {
        let hits: HashSet<GalleryItem> = list.into_iter().collect();
        result.retain(|i| hits.contains(i));
        log::trace!("{} results after intersection", result.len());
    }
    result
}
