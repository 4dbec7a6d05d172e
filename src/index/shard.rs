//! Sharding of the keyword index by first character.
//!
//! The full trie is split into one sub-trie per first character and the
//! sub-tries are grouped into `SHARD_COUNT` shards by `shard_key`. Each shard
//! is stored on Swarm as a JSON document; a query word only needs the shard
//! its first character maps to.

use crate::index::trie::KeywordTrie;
use crate::index::{intersect, normalize_words, GalleryIndex};
use crate::{Error, GalleryItem, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const SHARD_COUNT: usize = 3;

/// Environment variable prefix for shard references (`SHARD_SWARM_HASH_0`..)
pub const ENV_SHARD_PREFIX: &str = "SHARD_SWARM_HASH_";

/// Shard number a word starting with `c` lives in
pub fn shard_key(c: char) -> usize {
    c as usize % SHARD_COUNT
}

/// First-character sub-tries belonging to one shard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub tries: BTreeMap<char, KeywordTrie>,
}

impl Shard {
    /// Prefix search for a whole word within this shard
    pub fn search(&self, word: &str) -> Vec<GalleryItem> {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            return Vec::new();
        };
        self.tries
            .get(&first)
            .map(|t| t.search(chars.as_str()))
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Index(format!("invalid shard: {}", e)))
    }
}

/// Split `index` into exactly `SHARD_COUNT` shards (some may be empty)
pub fn shard(index: &GalleryIndex) -> Vec<Shard> {
    let mut shards = vec![Shard::default(); SHARD_COUNT];
    for (c, trie) in index.trie().split_first_char() {
        shards[shard_key(c)].tries.insert(c, trie);
    }
    shards
}

/// Fetches a shard by its storage reference
#[async_trait]
pub trait ShardLoader: Send + Sync {
    async fn load_shard(&self, reference: &str) -> Result<Shard>;
}

#[async_trait]
impl ShardLoader for HashMap<String, Shard> {
    async fn load_shard(&self, reference: &str) -> Result<Shard> {
        self.get(reference)
            .cloned()
            .ok_or_else(|| Error::Index(format!("unknown shard reference {}", reference)))
    }
}

/// Index split across shards that are loaded on demand
pub struct ShardedIndex<L> {
    references: Vec<Option<String>>,
    loader: L,
}

impl<L: ShardLoader> ShardedIndex<L> {
    /// `references[i]` is the storage reference of shard `i`
    pub fn new(references: Vec<Option<String>>, loader: L) -> Result<Self> {
        if references.len() != SHARD_COUNT {
            return Err(Error::Config(format!(
                "expected {} shard references, got {}",
                SHARD_COUNT,
                references.len()
            )));
        }
        Ok(Self { references, loader })
    }

    /// References taken from `SHARD_SWARM_HASH_0`..`SHARD_SWARM_HASH_2`
    pub fn from_env(loader: L) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), loader)
    }

    fn from_lookup<F>(lookup: F, loader: L) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let references = (0..SHARD_COUNT)
            .map(|i| {
                lookup(&format!("{}{}", ENV_SHARD_PREFIX, i)).filter(|r| !r.trim().is_empty())
            })
            .collect();
        Self::new(references, loader)
    }

    /// Items matching one (already normalized) word
    pub async fn search_word(&self, word: &str) -> Result<Vec<GalleryItem>> {
        let Some(first) = word.chars().next() else {
            return Ok(Vec::new());
        };
        let key = shard_key(first);
        let reference = self.references[key]
            .as_deref()
            .ok_or_else(|| {
                Error::Config(format!(
                    "no reference configured for shard {} (set {}{})",
                    key, ENV_SHARD_PREFIX, key
                ))
            })?;
        log::debug!("searching shard {} ({}) for '{}'", key, reference, word);
        let shard = self.loader.load_shard(reference).await?;
        let hits = shard.search(word);
        log::debug!("found {} results for '{}'", hits.len(), word);
        Ok(hits)
    }

    /// Items matching every word, looked up concurrently
    pub async fn query<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<GalleryItem>> {
        let words = normalize_words(words);
        let lookups = words.iter().map(|w| self.search_word(w));
        let per_word = futures::future::try_join_all(lookups).await?;
        Ok(intersect(per_word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, keywords: &[&str]) -> GalleryItem {
        GalleryItem {
            image_url: format!("https://img/{}.png", name),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            description: name.to_string(),
        }
    }

    fn index() -> GalleryIndex {
        let mut idx = GalleryIndex::new();
        idx.add(item("a", &["red", "dragon"]));
        idx.add(item("b", &["red", "fox"]));
        idx.add(item("c", &["blue", "dragon"]));
        idx
    }

    fn sharded(idx: &GalleryIndex) -> ShardedIndex<HashMap<String, Shard>> {
        let shards = shard(idx);
        let mut store = HashMap::new();
        let mut refs = Vec::new();
        for (i, s) in shards.into_iter().enumerate() {
            let r = format!("ref{}", i);
            store.insert(r.clone(), s);
            refs.push(Some(r));
        }
        ShardedIndex::new(refs, store).unwrap()
    }

    #[test]
    fn shard_key_is_codepoint_mod_three() {
        assert_eq!(shard_key('a'), 97 % 3);
        assert_eq!(shard_key('b'), 98 % 3);
        assert_eq!(shard_key('c'), 0);
    }

    #[test]
    fn shards_partition_first_characters() {
        let shards = shard(&index());
        assert_eq!(shards.len(), SHARD_COUNT);
        let mut firsts: Vec<char> = shards.iter().flat_map(|s| s.tries.keys().copied()).collect();
        firsts.sort();
        assert_eq!(firsts, vec!['b', 'd', 'f', 'r']);
        for (i, s) in shards.iter().enumerate() {
            assert!(s.tries.keys().all(|c| shard_key(*c) == i));
        }
    }

    #[test]
    fn shard_json_round_trip() {
        let shards = shard(&index());
        let s = &shards[shard_key('r')];
        let back = Shard::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(&back, s);
        assert!(matches!(Shard::from_json(b"nope"), Err(Error::Index(_))));
    }

    #[tokio::test]
    async fn sharded_query_matches_local_query() {
        let idx = index();
        let sharded = sharded(&idx);
        let queries = [
            vec!["red"],
            vec!["dragon"],
            vec!["red", "dragon"],
            vec!["re", "f"],
            vec!["pink"],
        ];
        for q in queries {
            assert_eq!(sharded.query(&q).await.unwrap(), idx.query(&q), "query {:?}", q);
        }
    }

    #[tokio::test]
    async fn references_come_from_shard_variables() {
        let idx = index();
        let store = sharded(&idx).loader;
        let sharded = ShardedIndex::from_lookup(
            |key| key.strip_prefix(ENV_SHARD_PREFIX).map(|i| format!("ref{}", i)),
            store,
        )
        .unwrap();
        let refs: Vec<Option<&str>> = sharded.references.iter().map(|r| r.as_deref()).collect();
        assert_eq!(refs, [Some("ref0"), Some("ref1"), Some("ref2")]);
        assert_eq!(
            sharded.query(&["red", "dragon"]).await.unwrap(),
            idx.query(&["red", "dragon"])
        );
    }

    #[tokio::test]
    async fn unset_shard_variable_fails_on_lookup() {
        let only_first = |key: &str| (key == "SHARD_SWARM_HASH_0").then(|| "ref0".to_string());
        let sharded = ShardedIndex::from_lookup(only_first, sharded(&index()).loader).unwrap();
        // 'r' maps to shard 0, 'd' to shard 1
        assert_eq!(sharded.query(&["red"]).await.unwrap().len(), 2);
        let err = sharded.query(&["dragon"]).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("SHARD_SWARM_HASH_1"));
    }

    #[tokio::test]
    async fn missing_reference_is_a_config_error() {
        let sharded =
            ShardedIndex::new(vec![None, None, None], HashMap::<String, Shard>::new()).unwrap();
        let err = sharded.query(&["red"]).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(ShardedIndex::new(vec![None], HashMap::<String, Shard>::new()).is_err());
    }
}
