//! Task id derivation from titles

/// Lowercase `title`, collapse every run of characters outside `[a-z0-9]`
/// into a single `-`, and trim leading and trailing `-`. Falls back to
/// `task` when nothing is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}

/// First of `base`, `base-2`, `base-3`, ... for which `taken` is false
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut suffix = 2u64;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::is_valid_task_id;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case("Draft onboarding flow", "draft-onboarding-flow")]
    #[case("  Fix: login -- bug!! ", "fix-login-bug")]
    #[case("v2.0 Release", "v2-0-release")]
    #[case("Café au lait", "caf-au-lait")]
    #[case("!!!", "task")]
    #[case("", "task")]
    #[case("already-a-slug", "already-a-slug")]
    fn test_slugify(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    #[test]
    fn test_unique_slug_suffixes() {
        let taken: HashSet<&str> = ["notes", "notes-2"].into_iter().collect();
        assert_eq!(unique_slug("notes", |s| taken.contains(s)), "notes-3");
        assert_eq!(unique_slug("fresh", |s| taken.contains(s)), "fresh");
    }

    proptest! {
        #[test]
        fn slug_is_always_a_valid_task_id(title in ".*") {
            let slug = slugify(&title);
            prop_assert!(is_valid_task_id(&slug));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn slugify_is_idempotent(title in ".*") {
            let once = slugify(&title);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
