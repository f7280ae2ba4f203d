use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").unwrap());
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "get",
    "got", "had", "has", "have", "he", "her", "here", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "just", "like", "me", "more", "my", "no", "not", "now", "of",
    "on", "one", "or", "our", "out", "over", "s", "she", "so", "some", "t", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "to", "up", "us", "was",
    "we", "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub min_length: usize,
    pub max_length: usize,
    /// Trimmed and lowercased by `new`.
    pub keyword: Option<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_length: 0,
            max_length: 10_000,
            keyword: None,
        }
    }
}

impl FilterCriteria {
    pub fn new(min_length: usize, max_length: usize, keyword: Option<&str>) -> Self {
        Self {
            min_length,
            max_length,
            keyword: keyword
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, block: &str) -> bool {
        let len = block.chars().count();
        if len < self.min_length || len > self.max_length {
            return false;
        }
        match &self.keyword {
            Some(keyword) => block.to_lowercase().contains(keyword.as_str()),
            None => true,
        }
    }

    pub fn apply(&self, blocks: &[String]) -> Vec<String> {
        blocks.iter().filter(|b| self.matches(b)).cloned().collect()
    }
}

/// Ordered subsequence of `blocks` within the length bounds (inclusive) and
/// containing `keyword`, ignoring case. A blank keyword matches everything.
pub fn filter(
    blocks: &[String],
    min_length: usize,
    max_length: usize,
    keyword: Option<&str>,
) -> Vec<String> {
    FilterCriteria::new(min_length, max_length, keyword).apply(blocks)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStats {
    pub block_count: usize,
    pub total_words: usize,
    pub length: Option<LengthStats>,
    pub words: Vec<(String, usize)>,
    pub mentions: Vec<(String, usize)>,
    pub hashtags: Vec<(String, usize)>,
}

impl FeedStats {
    pub fn compute(blocks: &[String]) -> Self {
        let mut words = HashMap::new();
        let mut mentions = HashMap::new();
        let mut hashtags = HashMap::new();
        let mut total_words = 0;

        for block in blocks {
            let lowered = block.to_lowercase();
            for m in MENTION.find_iter(&lowered) {
                *mentions.entry(m.as_str().to_string()).or_insert(0) += 1;
            }
            for m in HASHTAG.find_iter(&lowered) {
                *hashtags.entry(m.as_str().to_string()).or_insert(0) += 1;
            }
            for m in WORD.find_iter(&lowered) {
                total_words += 1;
                let word = m.as_str();
                let prefix = lowered[..m.start()].chars().next_back();
                if matches!(prefix, Some('@') | Some('#')) || STOPWORD_SET.contains(word) {
                    continue;
                }
                *words.entry(word.to_string()).or_insert(0) += 1;
            }
        }

        let lengths: Vec<usize> = blocks.iter().map(|b| b.chars().count()).collect();
        let length = match (lengths.iter().min(), lengths.iter().max()) {
            (Some(&min), Some(&max)) => Some(LengthStats {
                min,
                max,
                mean: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
            }),
            _ => None,
        };

        Self {
            block_count: blocks.len(),
            total_words,
            length,
            words: ranked(words),
            mentions: ranked(mentions),
            hashtags: ranked(hashtags),
        }
    }

    pub fn top_words(&self, n: usize) -> &[(String, usize)] {
        &self.words[..n.min(self.words.len())]
    }

    pub fn top_mentions(&self, n: usize) -> &[(String, usize)] {
        &self.mentions[..n.min(self.mentions.len())]
    }

    pub fn top_hashtags(&self, n: usize) -> &[(String, usize)] {
        &self.hashtags[..n.min(self.hashtags.len())]
    }
}

/// Count descending, then alphabetical, so output never depends on hash order.
fn ranked(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
