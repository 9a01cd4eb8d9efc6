//! Taxonomy name normalization
//!
//! Pure functions used to derive tag slugs and cluster identifiers:
//! - [`normalize_name`]: free-form label → hyphenated lowercase slug
//! - [`SynonymTable`]: immutable slug → canonical slug mapping
//! - [`stable_cluster_id`]: order-independent id for a set of member ids

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Built-in synonyms (alias, canonical). Both sides go through [`normalize_name`].
const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    ("llm", "large-language-models"),
    ("llms", "large-language-models"),
    ("large-language-model", "large-language-models"),
    ("k8s", "kubernetes"),
    ("kube", "kubernetes"),
    ("ml", "machine-learning"),
    ("ai", "artificial-intelligence"),
    ("genai", "generative-ai"),
    ("gen-ai", "generative-ai"),
    ("nlp", "natural-language-processing"),
    ("rag", "retrieval-augmented-generation"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("python3", "python"),
    ("golang", "go"),
    ("rustlang", "rust"),
    ("postgres", "postgresql"),
    ("pg", "postgresql"),
    ("cicd", "ci-cd"),
    ("vectordb", "vector-databases"),
    ("vector-db", "vector-databases"),
    ("vector-database", "vector-databases"),
    ("embedding", "embeddings"),
];

static BUILTIN: Lazy<SynonymTable> =
    Lazy::new(|| SynonymTable::from_pairs(BUILTIN_SYNONYMS.iter().copied()));

/// Turn a free-form label into a slug
///
/// Lowercases, turns whitespace and ASCII punctuation runs into a single hyphen,
/// drops quotes and any other non-alphanumeric character, and trims hyphens
/// from both ends.
///
/// ```
/// use docmap_store::normalize_name;
///
/// assert_eq!(normalize_name(" Large Language Models "), "large-language-models");
/// assert_eq!(normalize_name("K8s / Kubernetes"), "k8s-kubernetes");
/// assert_eq!(normalize_name("CI/CD"), "ci-cd");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if is_separator(c) {
            pending_hyphen = true;
        }
    }

    slug
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || (c.is_ascii_punctuation() && !matches!(c, '\'' | '"' | '`'))
}

/// Canonicalize a slug with the built-in synonym table
///
/// Unknown slugs pass through unchanged.
pub fn canonicalize_normalized_name(slug: &str) -> String {
    SynonymTable::builtin().canonicalize(slug)
}

/// `canonicalize_normalized_name(normalize_name(raw))`
pub fn canonical_slug(raw: &str) -> String {
    SynonymTable::builtin().canonical_slug(raw)
}

/// Immutable alias → canonical slug mapping
///
/// Chains are resolved when the table is built, so every canonical slug is a
/// fixed point. The built-in table is constructed once per process; stores
/// take an `Arc<SynonymTable>` so tests and callers can inject their own.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

impl SynonymTable {
    /// Process-wide built-in table
    pub fn builtin() -> &'static SynonymTable {
        &BUILTIN
    }

    /// Build a table from (alias, canonical) pairs
    pub fn from_pairs<I, A, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let raw: HashMap<String, String> = pairs
            .into_iter()
            .map(|(alias, canonical)| (normalize_name(alias.as_ref()), normalize_name(canonical.as_ref())))
            .filter(|(alias, canonical)| !alias.is_empty() && !canonical.is_empty() && alias != canonical)
            .collect();

        let entries = raw
            .keys()
            .map(|alias| (alias.clone(), resolve_chain(&raw, alias)))
            .filter(|(alias, canonical)| alias != canonical)
            .collect();

        Self { entries }
    }

    /// Canonical form of an already normalized slug
    pub fn canonicalize(&self, slug: &str) -> String {
        self.entries
            .get(slug)
            .cloned()
            .unwrap_or_else(|| slug.to_string())
    }

    /// Normalize then canonicalize a raw label
    pub fn canonical_slug(&self, raw: &str) -> String {
        self.canonicalize(&normalize_name(raw))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve_chain(raw: &HashMap<String, String>, alias: &str) -> String {
    let mut current = alias;
    // Bounded so a cycle in caller-supplied pairs still terminates
    for _ in 0..raw.len() {
        match raw.get(current) {
            Some(next) => current = next,
            None => break,
        }
    }
    current.to_string()
}

/// Order-independent identifier for a cluster
///
/// Members are sorted and deduplicated, then hashed together with the
/// clustering algorithm label (SHA-256, length-prefixed fields). The same
/// membership under a different algorithm label yields a different id.
///
/// ```
/// use docmap_store::stable_cluster_id;
///
/// assert_eq!(
///     stable_cluster_id(&["b", "a", "c"], "kmeans"),
///     stable_cluster_id(&["c", "b", "a"], "kmeans"),
/// );
/// ```
pub fn stable_cluster_id<S: AsRef<str>>(member_ids: &[S], algorithm: &str) -> String {
    let mut members: Vec<&str> = member_ids.iter().map(|m| m.as_ref()).collect();
    members.sort_unstable();
    members.dedup();

    let mut hasher = Sha256::new();
    hash_field(&mut hasher, algorithm);
    hasher.update((members.len() as u64).to_le_bytes());
    for member in &members {
        hash_field(&mut hasher, member);
    }

    let digest = format!("{:x}", hasher.finalize());
    format!("cluster-{}", &digest[..16])
}

fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
