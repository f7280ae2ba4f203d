pub mod ai;
pub mod analysis;
pub mod browser;
pub mod config;
pub mod error;
pub mod scraper;
pub mod snapshot;
pub mod utils;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;

/// One scraped feed item. The text is stored trimmed and never changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
    pub hash: String,
}

impl TextBlock {
    pub fn new(text: &str) -> Self {
        let text = text.trim().to_string();
        let hash = content_hash(&text);
        Self { text, hash }
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// SHA-256 over the whitespace-normalized text, as 64 lowercase hex chars.
pub fn content_hash(text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    Duplicate,
    TooShort(usize),
}

/// Ordered, deduplicated accumulation of blocks from one extraction run.
#[derive(Debug, Clone, Default)]
pub struct CollectedSet {
    blocks: Vec<TextBlock>,
    seen: HashSet<String>,
    min_length: usize,
}

impl CollectedSet {
    /// Blocks whose length is `<= min_length` are rejected.
    pub fn new(min_length: usize) -> Self {
        Self {
            blocks: Vec::new(),
            seen: HashSet::new(),
            min_length,
        }
    }

    pub fn insert(&mut self, text: &str) -> Insertion {
        let block = TextBlock::new(text);
        let len = block.len();
        if len <= self.min_length {
            return Insertion::TooShort(len);
        }
        if !self.seen.insert(block.hash.clone()) {
            return Insertion::Duplicate;
        }
        self.blocks.push(block);
        Insertion::Added
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&TextBlock> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.text.clone()).collect()
    }

    pub fn into_texts(self) -> Vec<String> {
        self.blocks.into_iter().map(|b| b.text).collect()
    }
}

/// Ephemeral notification emitted once per poll of the extraction loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub elapsed: Duration,
    pub total: Duration,
    pub count: usize,
    pub newest: Option<TextBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_fixed_width() {
        let a = content_hash("hello   world");
        let b = content_hash(" hello world\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn collected_set_keeps_first_seen_order() {
        let mut set = CollectedSet::new(20);
        let first = "the first post that is long enough";
        let second = "the second post that is long enough";
        assert_eq!(set.insert(first), Insertion::Added);
        assert_eq!(set.insert(second), Insertion::Added);
        assert_eq!(set.insert(first), Insertion::Duplicate);
        assert_eq!(set.texts(), vec![first.to_string(), second.to_string()]);
    }

    #[test]
    fn collected_set_rejects_threshold_length() {
        let mut set = CollectedSet::new(20);
        assert_eq!(set.insert(&"a".repeat(20)), Insertion::TooShort(20));
        assert_eq!(set.insert(&"a".repeat(21)), Insertion::Added);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let block = TextBlock::new("héllo");
        assert_eq!(block.len(), 5);
    }
}
