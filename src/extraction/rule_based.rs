//! Rule-based strategy: linguistic templates, cue phrases and ontology terms
//!
//! Deterministic: the same text and ontology always yield the same
//! candidates in the same order.

use super::candidate::{CandidateConcept, CandidateGenerator, GenerationContext, GenerationError};
use crate::graph::Strategy;
use crate::text::{is_content_word, normalize, span, split_sentences, words, Word};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

const MAX_PHRASE_WORDS: usize = 4;

const DETERMINERS: &[&str] = &["a", "an", "the", "any", "some", "all", "each", "every", "this", "these", "those"];

/// Head nouns and the category they imply
const HEAD_CATEGORIES: &[(&str, &str)] = &[
    ("network", "model"),
    ("model", "model"),
    ("architecture", "model"),
    ("transformer", "model"),
    ("classifier", "model"),
    ("encoder", "model"),
    ("decoder", "model"),
    ("machine", "model"),
    ("algorithm", "method"),
    ("method", "method"),
    ("technique", "method"),
    ("approach", "method"),
    ("procedure", "method"),
    ("descent", "method"),
    ("optimization", "method"),
    ("regression", "method"),
    ("learning", "method"),
    ("training", "method"),
    ("sampling", "method"),
    ("search", "method"),
    ("theory", "theory"),
    ("theorem", "theory"),
    ("hypothesis", "theory"),
    ("principle", "theory"),
    ("law", "theory"),
    ("framework", "theory"),
    ("analysis", "analysis"),
    ("estimation", "analysis"),
    ("inference", "analysis"),
    ("test", "analysis"),
    ("structure", "structure"),
    ("tree", "structure"),
    ("graph", "structure"),
    ("matrix", "structure"),
    ("vector", "structure"),
    ("function", "structure"),
    ("distribution", "structure"),
    ("space", "structure"),
];

const ADJECTIVES: &[&str] = &[
    "deep", "shallow", "large", "small", "high", "low", "latent", "sparse", "dense", "hidden",
    "supervised", "unsupervised", "semi-supervised", "self-supervised", "pretrained", "random",
    "linear", "nonlinear", "non-linear", "naive", "greedy", "bayesian",
];

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "al", "ive", "ar", "ic", "ous", "ent", "ant", "able", "ible", "ary", "ory", "ful", "less",
];

const NOUN_SUFFIXES: &[&str] = &["tion", "sion", "ment", "ism", "ity", "ics", "ness", "ance", "ence"];

fn is_a_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:is|are)\s+(?:a|an|one)?\s*(?:\w+\s+)?(?:type|kind|form|class|subclass|subtype|variant|family|instance)s?\s+of\s+",
        )
        .expect("static is-a pattern compiles")
    })
}

fn hearst_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:such\s+as|including)\s+").expect("static hearst pattern compiles"))
}

/// A domain ontology entry matched as a whole-word phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyTerm {
    pub term: String,
    pub category: String,
}

impl OntologyTerm {
    pub fn new(term: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category: category.into(),
        }
    }
}

/// Template, cue-phrase and ontology matcher
#[derive(Debug, Clone, Default)]
pub struct RuleBasedGenerator {
    /// Ontology entries with their lowercase word sequences
    ontology: Vec<(OntologyTerm, Vec<String>)>,
}

/// One raw match before aggregation
struct Mention<'a> {
    surface: &'a str,
    category: String,
    parent: Option<&'a str>,
}

impl RuleBasedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ontology(mut self, terms: impl IntoIterator<Item = OntologyTerm>) -> Self {
        for term in terms {
            let key: Vec<String> = words(&term.term).iter().map(Word::lower).collect();
            if !key.is_empty() {
                self.ontology.push((term, key));
            }
        }
        self
    }

    /// Run every rule over the text and aggregate repeated mentions.
    pub fn extract(&self, text: &str, context: &GenerationContext) -> Vec<CandidateConcept> {
        let mut mentions = Vec::new();
        for (_, sentence) in split_sentences(text) {
            is_a_mentions(sentence, &mut mentions);
            hearst_mentions(sentence, &mut mentions);
            self.ontology_mentions(sentence, &mut mentions);
            template_mentions(sentence, &mut mentions);
        }

        // (normalized surface, normalized parent) -> index into `out`
        let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();
        let mut out: Vec<CandidateConcept> = Vec::new();
        for mention in mentions {
            let key = (normalize(mention.surface), mention.parent.map(normalize));
            if let Some(&i) = index.get(&key) {
                out[i].score += 1.0;
                continue;
            }
            let mut candidate = CandidateConcept::new(
                mention.surface,
                mention.category,
                Strategy::RuleBased,
                1.0,
                context.paper_id.clone(),
            )
            .with_domain(context.domain.clone());
            candidate.parent_hint = mention.parent.map(str::to_string);
            index.insert(key, out.len());
            out.push(candidate);
        }
        out
    }

    fn ontology_mentions<'a>(&self, sentence: &'a str, out: &mut Vec<Mention<'a>>) {
        if self.ontology.is_empty() {
            return;
        }
        let ws = words(sentence);
        let lower: Vec<String> = ws.iter().map(Word::lower).collect();
        for start in 0..ws.len() {
            for (term, key) in &self.ontology {
                let end = start + key.len();
                if end <= ws.len() && lower[start..end] == key[..] {
                    out.push(Mention {
                        surface: &sentence[ws[start].start..ws[end - 1].end],
                        category: term.category.clone(),
                        parent: None,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl CandidateGenerator for RuleBasedGenerator {
    fn strategy(&self) -> Strategy {
        Strategy::RuleBased
    }

    async fn generate(
        &self,
        text: &str,
        context: &GenerationContext,
    ) -> Result<Vec<CandidateConcept>, GenerationError> {
        Ok(self.extract(text, context))
    }
}

/// "X is a (type|kind|...) of Y"
fn is_a_mentions<'a>(sentence: &'a str, out: &mut Vec<Mention<'a>>) {
    for m in is_a_pattern().find_iter(sentence) {
        let (Some(child), Some(parent)) = (
            trailing_noun_phrase(&sentence[..m.start()]),
            phrase_list(&sentence[m.end()..]).into_iter().next(),
        ) else {
            continue;
        };
        if normalize(child) == normalize(parent) {
            continue;
        }
        out.push(Mention {
            surface: child,
            category: category_of(child),
            parent: Some(parent),
        });
        out.push(Mention {
            surface: parent,
            category: category_of(parent),
            parent: None,
        });
    }
}

/// "Y such as X1, X2 and X3" / "Y including X1"
fn hearst_mentions<'a>(sentence: &'a str, out: &mut Vec<Mention<'a>>) {
    for m in hearst_pattern().find_iter(sentence) {
        let Some(parent) = trailing_noun_phrase(&sentence[..m.start()]) else {
            continue;
        };
        let children = phrase_list(&sentence[m.end()..]);
        if children.is_empty() {
            continue;
        }
        out.push(Mention {
            surface: parent,
            category: category_of(parent),
            parent: None,
        });
        for child in children {
            if normalize(child) != normalize(parent) {
                out.push(Mention {
                    surface: child,
                    category: category_of(child),
                    parent: Some(parent),
                });
            }
        }
    }
}

/// "[adjective]{1,2} [modifier]? [technical-noun]"
fn template_mentions<'a>(sentence: &'a str, out: &mut Vec<Mention<'a>>) {
    let ws = words(sentence);
    let lower: Vec<String> = ws.iter().map(Word::lower).collect();
    let joined = |a: usize, b: usize| !is_break(&sentence[ws[a].end..ws[b].start]);

    let mut i = 0;
    while i < ws.len() {
        let mut k = i;
        while k < ws.len() && k - i < 2 && is_adjective(&lower[k]) && (k == i || joined(k - 1, k)) {
            k += 1;
        }
        if k == i {
            i += 1;
            continue;
        }

        let head = if k < ws.len() && is_technical_noun(&lower[k]) && joined(k - 1, k) {
            Some(k)
        } else if k + 1 < ws.len()
            && is_content_word(&lower[k])
            && is_technical_noun(&lower[k + 1])
            && joined(k - 1, k)
            && joined(k, k + 1)
        {
            Some(k + 1)
        } else {
            None
        };

        match head {
            Some(end) => {
                let surface = &sentence[ws[i].start..ws[end].end];
                out.push(Mention {
                    surface,
                    category: category_of(surface),
                    parent: None,
                });
                i = end + 1;
            }
            None => i += 1,
        }
    }
}

/// Any non-whitespace between two words ends a phrase.
fn is_break(gap: &str) -> bool {
    gap.chars().any(|c| !c.is_whitespace())
}

/// The run of content words that ends the text.
fn trailing_noun_phrase(text: &str) -> Option<&str> {
    let ws = words(text);
    let mut start = ws.len();
    while start > 0 {
        let w = &ws[start - 1];
        if ws.len() - start == MAX_PHRASE_WORDS || !is_content_word(&w.lower()) {
            break;
        }
        if start < ws.len() && is_break(&text[w.end..ws[start].start]) {
            break;
        }
        start -= 1;
    }
    span(text, &ws[start..])
}

/// Noun phrases at the start of the text, following `,`/`and`/`or` lists.
fn phrase_list(text: &str) -> Vec<&str> {
    let ws = words(text);
    let lower: Vec<String> = ws.iter().map(Word::lower).collect();
    let mut out = Vec::new();
    let mut i = 0;

    loop {
        while i < ws.len() && DETERMINERS.contains(&lower[i].as_str()) {
            i += 1;
        }
        let start = i;
        while i < ws.len()
            && i - start < MAX_PHRASE_WORDS
            && is_content_word(&lower[i])
            && (i == start || !is_break(&text[ws[i - 1].end..ws[i].start]))
        {
            i += 1;
        }
        if i == start {
            break;
        }
        out.push(&text[ws[start].start..ws[i - 1].end]);

        if i >= ws.len() {
            break;
        }
        let gap = text[ws[i - 1].end..ws[i].start].trim();
        let conjunction = lower[i] == "and" || lower[i] == "or";
        match (gap, conjunction) {
            ("," | "", true) => i += 1,
            (",", false) => {}
            _ => break,
        }
    }
    out
}

/// Lowercase singular form of a word, good enough for head-noun lookup
fn singular(word: &str) -> &str {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("sis") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

fn head_category(lower: &str) -> Option<&'static str> {
    let s = singular(lower);
    HEAD_CATEGORIES.iter().find(|(noun, _)| *noun == s).map(|(_, c)| *c)
}

fn is_technical_noun(lower: &str) -> bool {
    head_category(lower).is_some()
        || (lower.len() >= 6 && NOUN_SUFFIXES.iter().any(|s| singular(lower).ends_with(s)))
}

fn is_adjective(lower: &str) -> bool {
    is_content_word(lower)
        && !is_technical_noun(lower)
        && (ADJECTIVES.contains(&lower)
            || (lower.len() >= 5 && ADJECTIVE_SUFFIXES.iter().any(|s| lower.ends_with(s))))
}

/// Category implied by the phrase's head (last) word
fn category_of(phrase: &str) -> String {
    words(phrase)
        .last()
        .and_then(|w| head_category(&w.lower()))
        .unwrap_or("concept")
        .to_string()
}
