//! Canonical forms for free-text attribute names and values.
//!
//! Two values are the same for migration purposes iff their [`normalize`]d
//! forms are equal. Slugs and taxonomy keys are derived from the normalized
//! form so every component agrees on them.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Meta key prefix under which children store their attribute pointers
pub const CHILD_META_PREFIX: &str = "attribute_";

/// Lowercase, trim, strip diacritics and collapse inner whitespace.
///
/// Control characters are dropped (whitespace controls become a space).
/// Runs of inner whitespace collapse to one space, so `"Azul  Marinho"` and
/// `"Azul Marinho"` resolve to the same term. Letters without a canonical
/// decomposition go through a small fallback table; everything else is left
/// untouched.
#[must_use]
pub fn normalize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let mut folded = String::with_capacity(cleaned.len());
    for c in cleaned.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match fold_char(c) {
            Some(replacement) => folded.push_str(replacement),
            None => folded.push(c),
        }
    }

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_char(c: char) -> Option<&'static str> {
    let replacement = match c {
        'á' | 'à' | 'ã' | 'â' | 'ä' => "a",
        'é' | 'ê' | 'è' | 'ë' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ó' | 'ô' | 'õ' | 'ò' | 'ö' | 'ø' => "o",
        'ú' | 'ü' | 'ù' | 'û' => "u",
        'ç' => "c",
        'ñ' => "n",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'đ' => "d",
        'ł' => "l",
        _ => return None,
    };
    Some(replacement)
}

/// URL-safe key: normalized, non-alphanumerics collapsed into single dashes.
///
/// `"Azul Marinho"` and `"azul-marinho"` share the slug `azul-marinho`.
#[must_use]
pub fn slug(value: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;

    for c in normalize(value).chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Compact form used for fuzzy comparisons: the slug without separators
#[must_use]
pub fn comparison_key(value: &str) -> String {
    normalize(value).chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Keep only lowercase ASCII letters, digits, `_` and `-`
#[must_use]
pub fn sanitize_key(value: &str) -> String {
    value
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Normalize a taxonomy identifier and make sure it carries `prefix`.
///
/// Returns an empty string when nothing usable is left, so callers can treat
/// an empty key as a validation failure.
#[must_use]
pub fn taxonomy_key(raw: &str, prefix: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let bare = lowered.strip_prefix(prefix).unwrap_or(&lowered);
    let name = sanitize_key(&slug(bare));

    if name.is_empty() {
        String::new()
    } else {
        format!("{}{}", prefix, name)
    }
}

/// Meta key under which a child stores its value for a free-text attribute
#[must_use]
pub fn child_meta_key(local_name: &str) -> String {
    format!("{}{}", CHILD_META_PREFIX, slug(local_name))
}

/// Meta key under which a child stores its term slug for a taxonomy
#[must_use]
pub fn taxonomy_meta_key(taxonomy: &str) -> String {
    format!("{}{}", CHILD_META_PREFIX, taxonomy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_accents_and_case() {
        assert_eq!(normalize("Café"), "cafe");
        assert_eq!(normalize("CAFÉ"), "cafe");
        assert_eq!(normalize("cafe"), "cafe");
        assert_eq!(normalize("  Ação  "), "acao");
        assert_eq!(normalize("Ørsted Straße"), "orsted strasse");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize("Azul\t\nMarinho"), "azul marinho");
        assert_eq!(normalize("Azul   Marinho"), "azul marinho");
        assert_eq!(normalize("a\u{0007}b"), "ab");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_normalize_keeps_punctuation() {
        assert_eq!(normalize("180/90"), "180/90");
        assert_eq!(normalize("P-M"), "p-m");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Azul Marinho"), "azul-marinho");
        assert_eq!(slug("  Verde--Água! "), "verde-agua");
        assert_eq!(slug("180/90"), "180-90");
        assert_eq!(slug("tamanho_pt"), "tamanho_pt");
        assert_eq!(slug("!!!"), "");
    }

    #[test]
    fn test_comparison_key() {
        assert_eq!(comparison_key("Azul-Marinho"), "azulmarinho");
        assert_eq!(comparison_key("azul marinho"), "azulmarinho");
    }

    #[test]
    fn test_taxonomy_key() {
        assert_eq!(taxonomy_key("Cor", "pa_"), "pa_cor");
        assert_eq!(taxonomy_key("pa_cor", "pa_"), "pa_cor");
        assert_eq!(taxonomy_key("PA_Cor", "pa_"), "pa_cor");
        assert_eq!(taxonomy_key("Tamanho do Aro", "pa_"), "pa_tamanho-do-aro");
        assert_eq!(taxonomy_key("", "pa_"), "");
        assert_eq!(taxonomy_key("pa_", "pa_"), "");
    }

    #[test]
    fn test_meta_keys() {
        assert_eq!(child_meta_key("Cor"), "attribute_cor");
        assert_eq!(child_meta_key("Medida Pneu"), "attribute_medida-pneu");
        assert_eq!(taxonomy_meta_key("pa_cor"), "attribute_pa_cor");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-Z0-9 áéíóúãõçÀÉÔÜñßø/\\-\t]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn slug_is_stable_under_normalization(s in "[a-zA-Z0-9 áéíóúãõç/_\\-]{0,40}") {
            prop_assert_eq!(slug(&normalize(&s)), slug(&s));
            prop_assert_eq!(slug(&slug(&s)), slug(&s));
        }
    }
}
