//! Heading slugs for link fragments.

/// Converts heading text to a fragment slug: lowercase, keep `[a-z0-9]`,
/// map spaces and dashes to a single dash, trim dashes at both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if (c == ' ' || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::punctuation("Hello World!@#", "hello-world")]
    #[case::collapse("A  --  B", "a-b")]
    #[case::trim("- Leading and trailing -", "leading-and-trailing")]
    #[case::digits("Step 2: Configure", "step-2-configure")]
    #[case::non_ascii("Café Menu", "caf-menu")]
    #[case::empty("!!!", "")]
    fn test_slugify(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(slugify(text), expected);
    }

    #[rstest]
    #[case("Hello World!@#")]
    #[case("Install & Configure")]
    #[case("  spaced  out  ")]
    fn test_slugify_is_stable(#[case] text: &str) {
        let once = slugify(text);
        assert_eq!(slugify(&once), once);
    }
}
