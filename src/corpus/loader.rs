//! Directory loader for the CLI
//!
//! Reads `.txt` and `.md` files below a directory into an `InMemoryCorpus`.
//! Markdown is rendered down to plain text; form feeds split pages; the file
//! stem becomes the paper id.

use super::{CorpusError, InMemoryCorpus, Paper};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::path::Path;
use walkdir::WalkDir;

/// Load every supported file under `root` (sorted by path for stable ids).
pub fn load_directory(root: impl AsRef<Path>, domain: Option<&str>) -> Result<InMemoryCorpus, CorpusError> {
    let root = root.as_ref();
    let mut corpus = InMemoryCorpus::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let text = match extension.as_deref() {
            Some("txt") => std::fs::read_to_string(path)?,
            Some("md") | Some("markdown") => markdown_to_text(&std::fs::read_to_string(path)?),
            _ => continue,
        };

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut paper = Paper::from_text(id, &text);
        if let Some(domain) = domain {
            paper = paper.with_domain(domain);
        }
        if paper.is_blank() {
            tracing::warn!(path = %path.display(), "skipping blank paper");
            continue;
        }
        corpus.push(paper);
    }

    if corpus.is_empty() {
        return Err(CorpusError::Empty(root.display().to_string()));
    }
    tracing::info!(papers = corpus.len(), root = %root.display(), "loaded corpus");
    Ok(corpus)
}

/// Render markdown to plain text, one block per paragraph.
///
/// Headings become their own blocks so they never fuse with the sentence
/// that follows. Code blocks are dropped.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    let mut in_code_block = false;

    for event in Parser::new_ext(markdown, Options::all()) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) | Event::Code(text) if !in_code_block => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::BlockQuote) => out.push_str("\n\n"),
            _ => {}
        }
    }
    out.trim().to_string()
}
