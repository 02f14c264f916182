//! Term listing for taxonomy pickers

use l2g_core::normalize::normalize;
use l2g_core::TermId;
use l2g_storage::{CatalogStore, StoreResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TERM_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSummary {
    pub term_id: TermId,
    pub name: String,
    pub slug: String,
}

/// Terms of `taxonomy` ordered by name, optionally filtered by an accent- and
/// case-insensitive substring of the name or slug
pub fn list_terms<S: CatalogStore + ?Sized>(
    store: &S,
    taxonomy: &str,
    search: Option<&str>,
    limit: Option<usize>,
) -> StoreResult<Vec<TermSummary>> {
    let needle = search.map(normalize).filter(|s| !s.is_empty());
    let limit = limit.unwrap_or(DEFAULT_TERM_LIMIT);

    let mut terms = store.list_terms(taxonomy)?;
    terms.sort_by(|a, b| {
        normalize(&a.name)
            .cmp(&normalize(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(terms
        .into_iter()
        .filter(|term| match &needle {
            Some(needle) => {
                normalize(&term.name).contains(needle.as_str())
                    || normalize(&term.slug).contains(needle.as_str())
            }
            None => true,
        })
        .take(limit)
        .map(|term| TermSummary {
            term_id: term.id,
            name: term.name,
            slug: term.slug,
        })
        .collect())
}
