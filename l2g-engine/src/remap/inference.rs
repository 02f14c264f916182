//! Option inference from child title and SKU

use l2g_core::normalize::normalize;
use regex::Regex;
use std::sync::OnceLock;

/// Picks one of a job's option values from free text on a child
pub trait ValueInferrer: Send + Sync {
    /// The inferred option, or `None` when nothing or more than one
    /// unrelated option matches
    fn infer(&self, title: &str, sku: &str, options: &[String]) -> Option<String>;
}

/// Boundary-aware token matching over the normalized title and SKU
#[derive(Debug, Clone)]
pub struct TokenInferrer {
    pub max_title_length: usize,
    pub max_candidates: usize,
}

impl TokenInferrer {
    pub fn new(max_title_length: usize, max_candidates: usize) -> Self {
        Self {
            max_title_length,
            max_candidates,
        }
    }

    fn haystacks(&self, title: &str, sku: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        let title = normalize(title);
        if !title.is_empty() && title.chars().count() <= self.max_title_length {
            out.push(title);
        }
        let sku = normalize(sku);
        if !sku.is_empty() {
            out.push(sku);
        }
        out
    }
}

fn numeric_option() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,4}(?:/\d{1,4})?$").ok()).as_ref()
}

fn numeric_token() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,4}(?:/\d{1,4})?\b").ok()).as_ref()
}

fn contains_token(haystack: &str, needle: &str) -> bool {
    if let (Some(option), Some(token)) = (numeric_option(), numeric_token()) {
        if option.is_match(needle) {
            return token.find_iter(haystack).any(|m| m.as_str() == needle);
        }
    }
    let pattern = format!(r"(?:^|[^\p{{L}}\p{{N}}]){}(?:$|[^\p{{L}}\p{{N}}])", regex::escape(needle));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(haystack),
        Err(_) => false,
    }
}

impl ValueInferrer for TokenInferrer {
    fn infer(&self, title: &str, sku: &str, options: &[String]) -> Option<String> {
        let haystacks = self.haystacks(title, sku);
        if haystacks.is_empty() || self.max_candidates == 0 {
            return None;
        }

        let mut candidates: Vec<(String, String)> = Vec::new();
        for option in options {
            let needle = normalize(option);
            if needle.is_empty() || candidates.iter().any(|(n, _)| *n == needle) {
                continue;
            }
            if haystacks.iter().any(|h| contains_token(h, &needle)) {
                candidates.push((needle, option.clone()));
                if candidates.len() >= self.max_candidates {
                    break;
                }
            }
        }

        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(|(_, option)| option),
            _ => {
                // "azul marinho" beats "azul", but "azul" vs "preto" is ambiguous
                let longest = candidates
                    .iter()
                    .max_by_key(|(needle, _)| needle.chars().count())?;
                let covers_all = candidates
                    .iter()
                    .all(|(needle, _)| longest.0.contains(needle.as_str()));
                covers_all.then(|| longest.1.clone())
            }
        }
    }
}
