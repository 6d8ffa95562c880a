//! Group membership predicate.

use crate::options::GroupMode;

/// Decides whether a field tagged with `field_groups` is emitted for the
/// `requested` groups.
///
/// - No requested groups: every field is emitted.
/// - A field without groups is never emitted once filtering is requested.
/// - [`GroupMode::Any`]: the two sets intersect.
/// - [`GroupMode::All`]: the field's groups contain every requested group.
pub fn include<F, R>(field_groups: &[F], requested: &[R], mode: GroupMode) -> bool
where
    F: AsRef<str>,
    R: AsRef<str>,
{
    if requested.is_empty() {
        return true;
    }
    if field_groups.is_empty() {
        return false;
    }

    let has = |g: &R| field_groups.iter().any(|f| f.as_ref() == g.as_ref());
    match mode {
        GroupMode::Any => requested.iter().any(has),
        GroupMode::All => requested.iter().all(has),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: &[&str] = &[];

    #[test]
    fn unfiltered_includes_everything() {
        assert!(include(NONE, NONE, GroupMode::Any));
        assert!(include(&["admin"], NONE, GroupMode::All));
    }

    #[test]
    fn untagged_field_is_excluded_when_filtering() {
        assert!(!include(NONE, &["public"], GroupMode::Any));
        assert!(!include(NONE, &["public"], GroupMode::All));
    }

    #[test]
    fn any_and_all() {
        let field = ["public", "admin"];
        assert!(include(&field, &["public", "internal"], GroupMode::Any));
        assert!(!include(&field, &["public", "internal"], GroupMode::All));
        assert!(include(&field, &["admin", "public"], GroupMode::All));
        assert!(!include(&field, &["internal"], GroupMode::Any));
    }

    fn groups() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-d]", 0..4)
    }

    proptest! {
        #[test]
        fn any_is_monotone_in_requested(field in groups(), a in "[a-d]", b in "[a-d]") {
            if include(&field, &[&a], GroupMode::Any) || include(&field, &[&b], GroupMode::Any) {
                prop_assert!(include(&field, &[&a, &b], GroupMode::Any));
            }
        }

        #[test]
        fn all_is_antitone_in_requested(field in groups(), a in "[a-d]", b in "[a-d]") {
            if include(&field, &[&a, &b], GroupMode::All) {
                prop_assert!(include(&field, &[&a], GroupMode::All));
                prop_assert!(include(&field, &[&b], GroupMode::All));
            }
        }

        #[test]
        fn untagged_never_included(requested in prop::collection::vec("[a-d]", 1..4)) {
            prop_assert!(!include(NONE, &requested, GroupMode::Any));
            prop_assert!(!include(NONE, &requested, GroupMode::All));
        }

        #[test]
        fn empty_request_is_noop(field in groups()) {
            prop_assert!(include(&field, NONE, GroupMode::Any));
            prop_assert!(include(&field, NONE, GroupMode::All));
        }
    }
}
