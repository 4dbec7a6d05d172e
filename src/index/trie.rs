//! Keyword prefix trie mapping words to the gallery items tagged with them.

use crate::GalleryItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrieNode {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<char, TrieNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    items: Vec<GalleryItem>,
}

impl TrieNode {
    fn collect(&self, out: &mut Vec<GalleryItem>) {
        out.extend(self.items.iter().cloned());
        for child in self.children.values() {
            child.collect(out);
        }
    }

    fn word_count(&self) -> usize {
        let below: usize = self.children.values().map(TrieNode::word_count).sum();
        usize::from(!self.items.is_empty()) + below
    }
}

/// Prefix trie of keywords. Each complete word keeps the items inserted
/// under it; a prefix search returns everything at or below the prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordTrie {
    root: TrieNode,
}

impl KeywordTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str, item: GalleryItem) {
        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        node.items.push(item);
    }

    /// Items stored under every word starting with `prefix`: the prefix
    /// node's own items first, then children in character order.
    pub fn search(&self, prefix: &str) -> Vec<GalleryItem> {
        let mut node = &self.root;
        for c in prefix.chars() {
            match node.children.get(&c) {
                Some(next) => node = next,
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        node.collect(&mut out);
        out
    }

    /// One sub-trie per first character. Searching a sub-trie with the
    /// remainder of a word is equivalent to searching the whole word here.
    pub fn split_first_char(&self) -> BTreeMap<char, KeywordTrie> {
        self.root
            .children
            .iter()
            .map(|(c, node)| (*c, KeywordTrie { root: node.clone() }))
            .collect()
    }

    /// Number of distinct complete words
    pub fn word_count(&self) -> usize {
        self.root.word_count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.items.is_empty() && self.root.children.is_empty()
    }
}
