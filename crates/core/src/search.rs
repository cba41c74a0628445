//! Search over generated registry summaries.
//!
//! The index is an explicit service: the caller creates it, fills it with
//! [`SearchIndex::init`], refreshes it with [`SearchIndex::reindex`] and
//! drops its contents with [`SearchIndex::dispose`]. It only reads
//! `registry.json` files, never compiler internals.
//!
//! Full-text scoring is a small in-memory inverted index with idf-weighted
//! per-token postings, not an external FTS engine. It is rebuilt on every
//! `init` and nothing is persisted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::emit::REGISTRY_FILE;
use crate::error::{Error, Result};
use crate::openapi::HttpMethod;
use crate::registry::RegistrySummary;

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub source: String,
    pub operation_id: String,
    pub callable: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Identifier,
    Path,
    Tag,
    Summary,
    Description,
}

impl Field {
    const fn weight(self) -> f64 {
        match self {
            Self::Identifier => 3.0,
            Self::Path | Self::Tag => 2.0,
            Self::Summary => 1.0,
            Self::Description => 0.5,
        }
    }
}

#[derive(Debug, Default)]
struct Loaded {
    /// Output root the summaries were read from, if any.
    root: Option<PathBuf>,
    summaries: Vec<RegistrySummary>,
    entries: Vec<SearchHit>,
    /// Token to (entry index, accumulated field weight).
    postings: BTreeMap<String, BTreeMap<usize, f64>>,
}

/// Split text into lowercase tokens, breaking on punctuation and camelCase.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut current = String::new();
        let mut previous: Option<char> = None;
        for c in word.chars() {
            let boundary = previous.is_some_and(|p| {
                (p.is_lowercase() && c.is_uppercase()) || (p.is_alphabetic() != c.is_alphabetic())
            });
            if boundary && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            current.extend(c.to_lowercase());
            previous = Some(c);
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

impl Loaded {
    fn build(root: Option<PathBuf>, summaries: Vec<RegistrySummary>) -> Self {
        let mut loaded = Self {
            root,
            ..Self::default()
        };
        let mut seen = BTreeSet::new();
        for summary in &summaries {
            for request in &summary.requests {
                let descriptor = &request.descriptor;
                // Variants of one operation are a single result.
                if !seen.insert((summary.source.clone(), descriptor.operation_id.clone())) {
                    continue;
                }
                let index = loaded.entries.len();
                loaded.entries.push(SearchHit {
                    source: summary.source.clone(),
                    operation_id: descriptor.operation_id.clone(),
                    callable: request.callable.clone(),
                    method: descriptor.method,
                    url: descriptor.url.clone(),
                    summary: descriptor.summary.clone(),
                    score: 0.0,
                });

                let mut fields = vec![
                    (Field::Identifier, descriptor.operation_id.clone()),
                    (Field::Path, descriptor.url.clone()),
                ];
                fields.extend(descriptor.tags.iter().map(|t| (Field::Tag, t.clone())));
                fields.extend(descriptor.summary.iter().map(|s| (Field::Summary, s.clone())));
                fields.extend(
                    descriptor
                        .description
                        .iter()
                        .map(|d| (Field::Description, d.clone())),
                );
                for (field, text) in fields {
                    for token in tokenize(&text) {
                        *loaded
                            .postings
                            .entry(token)
                            .or_default()
                            .entry(index)
                            .or_default() += field.weight();
                    }
                }
            }
        }
        loaded.summaries = summaries;
        loaded
    }
}

fn read_summaries(out_root: &Path) -> Vec<RegistrySummary> {
    let mut paths: Vec<PathBuf> = WalkDir::new(out_root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == REGISTRY_FILE)
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|path| match RegistrySummary::load(path) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(path = %path.display(), "Skipping registry summary: {err}");
                None
            }
        })
        .collect()
}

/// Ranked full-text index over request descriptors.
#[derive(Debug, Default)]
pub struct SearchIndex {
    loaded: Option<Loaded>,
}

impl SearchIndex {
    /// An empty, uninitialized index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `<out_root>/<source>/registry.json`. Returns the number of
    /// indexed operations.
    pub fn init(&mut self, out_root: &Path) -> usize {
        let summaries = read_summaries(out_root);
        self.loaded = Some(Loaded::build(Some(out_root.to_path_buf()), summaries));
        debug!(out_root = %out_root.display(), operations = self.len(), "Search index initialized.");
        self.len()
    }

    /// Index summaries that are already in memory.
    pub fn init_from_summaries(&mut self, summaries: Vec<RegistrySummary>) -> usize {
        self.loaded = Some(Loaded::build(None, summaries));
        self.len()
    }

    /// Rebuild from the same place the index was initialized from.
    pub fn reindex(&mut self) -> Result<usize> {
        let loaded = self.loaded.take().ok_or(Error::IndexNotInitialized)?;
        let summaries = match &loaded.root {
            Some(root) => read_summaries(root),
            None => loaded.summaries,
        };
        self.loaded = Some(Loaded::build(loaded.root, summaries));
        Ok(self.len())
    }

    /// Drop the indexed data. The index must be initialized again before use.
    pub fn dispose(&mut self) {
        self.loaded = None;
    }

    /// Whether `init` has been called since the last `dispose`.
    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    /// Number of indexed operations.
    pub fn len(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.entries.len())
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best matches for `query`, highest score first.
    ///
    /// Exact token matches score by field weight and rarity; prefix matches
    /// score half.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let loaded = self.loaded.as_ref().ok_or(Error::IndexNotInitialized)?;
        let total = loaded.entries.len() as f64;

        let mut scores: BTreeMap<usize, f64> = BTreeMap::new();
        for term in tokenize(query) {
            for (token, postings) in &loaded.postings {
                let factor = if *token == term {
                    1.0
                } else if term.len() >= 2 && token.starts_with(&term) {
                    0.5
                } else {
                    continue;
                };
                let idf = (1.0 + total / postings.len() as f64).ln();
                for (index, weight) in postings {
                    *scores.entry(*index).or_default() += factor * weight * idf;
                }
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(index, score)| SearchHit {
                score,
                ..loaded.entries[index].clone()
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.operation_id.cmp(&b.operation_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
