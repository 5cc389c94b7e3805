//! Text cleanup and word sampling.
//!
//! Everything that reaches the typing session goes through here: raw
//! extracted text is cleaned down to printable ASCII, split on spaces and,
//! for long documents, cut down to a random contiguous window of words.

use std::{ops::Deref, sync::Arc};

use rand::Rng;

/// Number of words drawn from a document for a single test.
pub const DEFAULT_SAMPLE_WORDS: usize = 150;

/// Ordered list of target words for one session. Cheap to clone, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct WordSequence(Arc<[String]>);

impl WordSequence {
    pub fn new(words: Vec<String>) -> Self {
        Self(words.into())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Deref for WordSequence {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for WordSequence {
    fn from(words: Vec<String>) -> Self {
        Self::new(words)
    }
}

impl<'a> From<&[&'a str]> for WordSequence {
    fn from(words: &[&'a str]) -> Self {
        Self::new(words.iter().map(|w| w.to_string()).collect())
    }
}

/// Collapses whitespace runs to a single space, drops anything outside
/// printable ASCII and trims both ends.
pub fn clean(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some(' '),
            ' '..='~' => Some(c),
            _ => None,
        })
        .collect();

    filtered
        .split(' ')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn tokenize(text: &str) -> WordSequence {
    clean(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>()
        .into()
}

/// Picks a uniformly random contiguous window of `word_count` words.
///
/// Texts that already fit are returned whole, so the result always holds
/// exactly `min(word_count, total_words)` words in their original order.
pub fn sample<R: Rng + ?Sized>(text: &str, word_count: usize, rng: &mut R) -> WordSequence {
    let words = tokenize(text);
    if words.len() <= word_count {
        return words;
    }

    let max_start = words.len() - word_count;
    let start = rng.gen_range(0..=max_start);
    WordSequence::new(words[start..start + word_count].to_vec())
}
