//! Staff role normalization.
//!
//! Catalog staff credits carry free-text roles such as
//! `"Key Animation (ep 3, 7)"` or `"Director (Episode 1 (special))"`. Only the
//! leading label matters for modeling, so every parenthesized qualifier is
//! removed, nested ones included.

/// Strips every parenthesized qualifier from `raw` and trims the result.
///
/// The first `(` is located and the scan walks forward counting nesting depth
/// until the matching `)` or the end of the input. The text before the paren
/// and the text after the match are trimmed, joined with one space, and the
/// process repeats until no `(` is left.
///
/// Unbalanced input never fails: an unmatched `(` swallows the rest of the
/// string. A stray `)` without an opener is kept.
///
/// # Examples
///
/// ```
/// use animuse::role::normalize_role;
///
/// assert_eq!(normalize_role("Key Animation (ep 1, 3)"), "Key Animation");
/// assert_eq!(normalize_role("A (B (C)) D"), "A D");
/// assert_eq!(normalize_role("Director"), "Director");
/// ```
#[must_use]
pub fn normalize_role(raw: &str) -> String {
    let mut role = raw.to_string();

    // Each pass removes at least the first '(' and adds none.
    while let Some(open) = role.find('(') {
        let close = matching_paren(&role, open);
        let head = role[..open].trim();
        let tail = close.map_or("", |close| role[close + 1..].trim());
        role = format!("{head} {tail}");
    }

    role.trim().to_string()
}

/// Byte offset of the `)` closing the paren at `open`, if the input has one.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_role_unchanged() {
        assert_eq!(normalize_role("Director"), "Director");
        assert_eq!(normalize_role("  Music  "), "Music");
    }

    #[test]
    fn test_strips_qualifier() {
        assert_eq!(normalize_role("Key Animation (ep 3)"), "Key Animation");
        assert_eq!(normalize_role("Key Animation (ep 1, 3)"), "Key Animation");
    }

    #[test]
    fn test_nested_qualifiers() {
        assert_eq!(normalize_role("A (B (C)) D"), "A D");
        assert_eq!(normalize_role("Director (Episode 1 (special))"), "Director");
    }

    #[test]
    fn test_multiple_groups_keep_commas_outside() {
        assert_eq!(
            normalize_role("Storyboard (ep 2), Episode Director (ep 2, 5)"),
            "Storyboard , Episode Director"
        );
    }

    #[test]
    fn test_unbalanced_input_terminates() {
        assert_eq!(normalize_role("Script (ep 4"), "Script");
        assert_eq!(normalize_role("((("), "");
        assert_eq!(normalize_role("Music )"), "Music )");
        assert_eq!(normalize_role("(leading) Director"), "Director");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_role(""), "");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalization_is_idempotent(s in "[a-zA-Z ,()]{0,40}") {
                let once = normalize_role(&s);
                prop_assert_eq!(normalize_role(&once), once.clone());
            }

            #[test]
            fn normalized_roles_have_no_open_paren(s in "\\PC{0,40}") {
                prop_assert!(!normalize_role(&s).contains('('));
            }
        }
    }
}
