//! Parser safety: arbitrary identifiers never panic, and keys are stable.

use proptest::prelude::*;

use skillport::sources::ParsedSource;

proptest! {
    #[test]
    fn parse_never_panics(input in ".{0,80}") {
        let _ = ParsedSource::parse(&input);
    }

    #[test]
    fn key_ignores_case_and_url_form(
        owner in "[A-Za-z][A-Za-z0-9-]{0,12}",
        repo in "[A-Za-z][A-Za-z0-9_-]{0,12}",
    ) {
        let short = ParsedSource::parse(&format!("{owner}/{repo}")).unwrap();
        let url = ParsedSource::parse(&format!("https://github.com/{owner}/{repo}.git")).unwrap();
        let upper = ParsedSource::parse(&format!("{}/{}", owner.to_uppercase(), repo.to_uppercase())).unwrap();
        prop_assert_eq!(short.key(), url.key());
        prop_assert_eq!(short.key(), upper.key());
        prop_assert_eq!(short.key(), format!("{owner}/{repo}").to_lowercase());
    }

    #[test]
    fn pinned_ref_does_not_change_key(
        owner in "[a-z]{1,10}",
        repo in "[a-z]{1,10}",
        git_ref in "[a-z0-9][a-z0-9.]{0,10}",
    ) {
        let plain = ParsedSource::parse(&format!("{owner}/{repo}")).unwrap();
        let pinned = ParsedSource::parse(&format!("{owner}/{repo}@{git_ref}")).unwrap();
        prop_assert_eq!(plain.key(), pinned.key());
        prop_assert_eq!(pinned.git_ref.as_deref(), Some(git_ref.as_str()));
    }
}
