//! Slug derivation shared by every place a jockey or venue identity is built.

/// Lowercase, drop apostrophes, collapse each non-alphanumeric run into a
/// single `-`, and trim separators from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if matches!(ch, '\'' | '\u{2018}' | '\u{2019}') {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("  Ms. Jane   Doe  "), "ms-jane-doe");
        assert_eq!(slugify("Pakenham Synthetic"), "pakenham-synthetic");
    }

    #[test]
    fn test_slugify_apostrophes_and_punctuation() {
        assert_eq!(slugify("Tom O'Brien"), "tom-obrien");
        assert_eq!(slugify("Tom O\u{2019}Brien"), "tom-obrien");
        assert_eq!(slugify("--A.B. Smith (a2)--"), "a-b-smith-a2");
    }

    #[test]
    fn test_slugify_degenerate() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify(" - / "), "");
    }

    #[test]
    fn test_slugify_idempotent() {
        let once = slugify("Craig Williams (a1.5/54kg)");
        assert_eq!(slugify(&once), once);
    }
}
