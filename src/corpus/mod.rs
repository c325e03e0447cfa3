//! Source corpus: papers, pages and sentence locators
//!
//! The engine never touches the filesystem. Callers hand a batch its papers
//! through `SourceCorpus`; `loader` builds one from a directory for the CLI.

pub mod loader;

pub use loader::load_directory;

use crate::text::split_sentences;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page separator used by most PDF-to-text converters.
pub const PAGE_BREAK: char = '\x0c';

/// Identifier of a source paper
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Position of a sentence inside a paper: 1-based page number and byte
/// offset within that page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locator {
    pub page: u32,
    pub offset: usize,
}

impl Locator {
    pub fn new(page: u32, offset: usize) -> Self {
        Self { page, offset }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}:{}", self.page, self.offset)
    }
}

/// One page of extracted paper text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// A paper as supplied by the corpus provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: Option<String>,
    /// Research domain tag carried onto the concepts this paper surfaces
    pub domain: Option<String>,
    pub pages: Vec<Page>,
}

/// A sentence cut from a paper, with provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSentence {
    pub paper_id: PaperId,
    pub locator: Locator,
    pub text: String,
}

impl Paper {
    pub fn new(id: impl Into<PaperId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            domain: None,
            pages: Vec::new(),
        }
    }

    /// Build a paper from raw text, splitting pages on form feeds.
    pub fn from_text(id: impl Into<PaperId>, text: &str) -> Self {
        text.split(PAGE_BREAK)
            .fold(Self::new(id), |paper, page| paper.with_page(page))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Append a page; pages are numbered from 1 in insertion order.
    pub fn with_page(mut self, text: impl Into<String>) -> Self {
        let number = self.pages.len() as u32 + 1;
        self.pages.push(Page {
            number,
            text: text.into(),
        });
        self
    }

    /// All page text joined with blank lines, so sentences never span pages.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// True when no page carries any alphanumeric content.
    pub fn is_blank(&self) -> bool {
        !self
            .pages
            .iter()
            .any(|p| p.text.chars().any(char::is_alphanumeric))
    }

    /// Every sentence of the paper with its page/offset locator.
    pub fn sentences(&self) -> Vec<LocatedSentence> {
        self.pages
            .iter()
            .flat_map(|page| {
                split_sentences(&page.text)
                    .into_iter()
                    .map(move |(offset, text)| LocatedSentence {
                        paper_id: self.id.clone(),
                        locator: Locator::new(page.number, offset),
                        text: text.to_string(),
                    })
            })
            .collect()
    }
}

/// Supplies raw papers to a batch.
pub trait SourceCorpus: Send + Sync {
    fn papers(&self) -> &[Paper];
}

/// Corpus held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    papers: Vec<Paper>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paper(mut self, paper: Paper) -> Self {
        self.papers.push(paper);
        self
    }

    pub fn push(&mut self, paper: Paper) {
        self.papers.push(paper);
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

impl SourceCorpus for InMemoryCorpus {
    fn papers(&self) -> &[Paper] {
        &self.papers
    }
}

impl FromIterator<Paper> for InMemoryCorpus {
    fn from_iter<I: IntoIterator<Item = Paper>>(iter: I) -> Self {
        Self {
            papers: iter.into_iter().collect(),
        }
    }
}

/// Errors raised while assembling a corpus from disk
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("No readable papers found under {0}")]
    Empty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_splits_pages_on_form_feed() {
        let paper = Paper::from_text("p1", "First page.\x0cSecond page. More text.");
        assert_eq!(paper.pages.len(), 2);
        assert_eq!(paper.pages[1].number, 2);

        let sentences = paper.sentences();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[1].locator, Locator::new(2, 0));
        assert_eq!(sentences[2].locator, Locator::new(2, 13));
        assert_eq!(sentences[2].text, "More text.");
    }

    #[test]
    fn blank_papers_are_detected() {
        assert!(Paper::new("empty").is_blank());
        assert!(Paper::from_text("ws", "   \n\n  ").is_blank());
        assert!(!Paper::from_text("ok", "Loops.").is_blank());
    }

    #[test]
    fn corpus_collects_papers() {
        let corpus: InMemoryCorpus = vec![Paper::new("a"), Paper::new("b")].into_iter().collect();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.papers()[1].id.as_str(), "b");
    }
}
