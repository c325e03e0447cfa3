//! Text utilities shared by the generators and the evidence binder
//!
//! Sentence splitting keeps byte offsets so evidence can point back into the
//! page it came from. Word splitting returns slices of the original text so
//! surface forms keep their case.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Words that never start, end or sit inside a concept mention.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "although", "am", "among",
    "an", "and", "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "done", "down",
    "during", "each", "either", "et", "etc", "even", "every", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "however",
    "i", "if", "in", "including", "into", "is", "it", "its", "itself", "just", "kind", "may",
    "might", "more", "most", "much", "must", "my", "no", "nor", "not", "of", "off", "often", "on",
    "once", "one", "only", "or", "other", "our", "ours", "out", "over", "own", "same", "several",
    "she", "should", "show", "shows", "shown", "since", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those",
    "through", "thus", "to", "too", "type", "under", "until", "up", "upon", "us", "use", "used",
    "uses", "using", "very", "via", "was", "we", "were", "what", "when", "where", "whether",
    "which", "while", "who", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your",
];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &["al", "cf", "e.g", "eq", "eqs", "fig", "figs", "i.e", "no", "sec", "vs"];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Whether a lowercase word is a stopword.
pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word)
}

/// Case- and whitespace-insensitive form used for grouping and identity.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into sentences, returning `(byte offset, sentence)` pairs.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace (unless the
/// preceding word is a known abbreviation or a single-letter initial), or at
/// a blank line. Fragments without any alphanumeric character are dropped.
pub fn split_sentences(text: &str) -> Vec<(usize, &str)> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '.' | '!' | '?' => {
                let followed_by_space = chars.peek().map_or(true, |(_, n)| n.is_whitespace());
                followed_by_space && !(c == '.' && ends_with_abbreviation(&text[start..i]))
            }
            '\n' => chars.peek().map_or(false, |(_, n)| *n == '\n' || *n == '\r'),
            _ => false,
        };

        if boundary {
            let end = i + c.len_utf8();
            push_trimmed(&mut sentences, text, start, end);
            start = end;
        }
    }
    push_trimmed(&mut sentences, text, start, text.len());
    sentences
}

fn push_trimmed<'a>(out: &mut Vec<(usize, &'a str)>, text: &'a str, start: usize, end: usize) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        out.push((start + leading, trimmed));
    }
}

fn ends_with_abbreviation(prefix: &str) -> bool {
    let last = match prefix.split_whitespace().last() {
        Some(word) => word.trim_start_matches(|c: char| !c.is_alphanumeric()),
        None => return false,
    };
    if last.chars().count() == 1 && last.chars().all(char::is_uppercase) {
        return true;
    }
    ABBREVIATIONS.contains(&last.to_lowercase().as_str())
}

/// A word slice with its byte range inside the text it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Word<'_> {
    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Split text into words: runs of alphanumerics, allowing inner `-` and `'`.
pub fn words(text: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    let is_word_char = |c: char| c.is_alphanumeric() || c == '-' || c == '\'';

    for (i, c) in text.char_indices() {
        match (start, is_word_char(c)) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                push_word(&mut out, text, s, i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        push_word(&mut out, text, s, text.len());
    }
    out
}

fn push_word<'a>(out: &mut Vec<Word<'a>>, text: &'a str, start: usize, end: usize) {
    let raw = &text[start..end];
    let trimmed = raw.trim_matches(|c: char| c == '-' || c == '\'');
    if trimmed.is_empty() {
        return;
    }
    let offset = start + (raw.len() - raw.trim_start_matches(|c: char| c == '-' || c == '\'').len());
    out.push(Word {
        text: trimmed,
        start: offset,
        end: offset + trimmed.len(),
    });
}

/// Whether a word can carry meaning inside a term (not a stopword, not a
/// bare number, at least two characters).
pub fn is_content_word(lower: &str) -> bool {
    lower.chars().count() >= 2
        && !is_stopword(lower)
        && lower.chars().any(char::is_alphabetic)
}

/// Cut a span of consecutive words out of the text they came from.
pub fn span<'a>(text: &'a str, words: &[Word<'a>]) -> Option<&'a str> {
    let first = words.first()?;
    let last = words.last()?;
    Some(&text[first.start..last.end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_case_and_whitespace_insensitive() {
        assert_eq!(normalize("  Convolutional   Neural\tNetwork "), "convolutional neural network");
        assert_eq!(normalize("CNN"), normalize("cnn"));
    }

    #[test]
    fn split_sentences_keeps_offsets() {
        let text = "Loops repeat work. Functions wrap it!  Variables hold state?";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[1].1, "Functions wrap it!");
        assert_eq!(&text[sentences[1].0..sentences[1].0 + sentences[1].1.len()], "Functions wrap it!");
        assert_eq!(sentences[2].1, "Variables hold state?");
    }

    #[test]
    fn split_sentences_respects_abbreviations_and_decimals() {
        let text = "Accuracy rose to 93.5 percent, cf. Table 2. See Smith et al. for details.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].1.ends_with("Table 2."));
    }

    #[test]
    fn split_sentences_breaks_on_blank_lines() {
        let text = "Introduction\n\nNeural networks learn representations";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].1, "Introduction");
    }

    #[test]
    fn words_trim_punctuation_and_keep_hyphens() {
        let text = "A state-of-the-art model, (CNN) 'quoted'.";
        let ws: Vec<&str> = words(text).iter().map(|w| w.text).collect();
        assert_eq!(ws, vec!["A", "state-of-the-art", "model", "CNN", "quoted"]);
        let w = words(text)[3];
        assert_eq!(&text[w.start..w.end], "CNN");
    }

    #[test]
    fn content_words_exclude_stopwords_and_numbers() {
        assert!(is_content_word("network"));
        assert!(!is_content_word("the"));
        assert!(!is_content_word("2024"));
        assert!(!is_content_word("x"));
    }
}
