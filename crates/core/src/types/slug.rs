//! URL slug generation.

/// Turn a display name into a URL slug.
///
/// ASCII letters and digits are lowercased and kept; every run of other
/// characters becomes a single `-`. Leading and trailing dashes are removed.
///
/// ```
/// use emporium_core::slugify;
///
/// assert_eq!(slugify("Summer Hats & Caps"), "summer-hats-caps");
/// assert_eq!(slugify("  --Linen  Shirt (L)-- "), "linen-shirt-l");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(slugify("Coffee Mugs"), "coffee-mugs");
    }

    #[test]
    fn test_collapses_separators() {
        assert_eq!(slugify("a  --  b__c"), "a-b-c");
    }

    #[test]
    fn test_drops_non_ascii() {
        assert_eq!(slugify("Café Crème 2"), "caf-cr-me-2");
    }

    #[test]
    fn test_empty_when_no_alphanumerics() {
        assert_eq!(slugify("!!! ???"), "");
    }
}
