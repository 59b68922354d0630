//! # Secret Selector
//!
//! Picks the active key by name prefix, the latest key by creation time, and the
//! set of keys to demote.
//!
//! Ordering is `(creation timestamp in seconds, name)`. Two keys created in the same
//! second are ordered by name, so the latest key is always a single well-defined
//! secret and demotion can never hit it.

use crate::config::SelectionMode;
use crate::error::NotFoundError;
use crate::model::SealedKeySecret;

/// Select the active key by name prefix
///
/// In [`SelectionMode::Scan`] the first secret (arrival order) whose name starts with
/// `prefix` is returned. [`SelectionMode::FirstElement`] only ever looks at the first
/// secret and fails if that one does not match, even when a later secret would.
///
/// # Errors
///
/// [`NotFoundError::Empty`] for an empty set, [`NotFoundError::NoPrefixMatch`] when no
/// candidate matches.
pub fn select_active_by_prefix(
    secrets: &[SealedKeySecret],
    prefix: &str,
    mode: SelectionMode,
) -> Result<SealedKeySecret, NotFoundError> {
    if secrets.is_empty() {
        return Err(NotFoundError::Empty);
    }

    let candidate = match mode {
        SelectionMode::Scan => secrets.iter().find(|s| s.name.starts_with(prefix)),
        SelectionMode::FirstElement => secrets.first().filter(|s| s.name.starts_with(prefix)),
    };

    candidate.cloned().ok_or_else(|| NotFoundError::NoPrefixMatch {
        prefix: prefix.to_string(),
    })
}

/// Select the most recently created key
///
/// # Errors
///
/// [`NotFoundError::Empty`] when `secrets` is empty.
pub fn select_latest_by_creation_time(
    secrets: &[SealedKeySecret],
) -> Result<SealedKeySecret, NotFoundError> {
    let mut sorted: Vec<&SealedKeySecret> = secrets.iter().collect();
    sorted.sort_by(|a, b| a.creation_order_key().cmp(&b.creation_order_key()));
    sorted.last().map(|s| (*s).clone()).ok_or(NotFoundError::Empty)
}

/// Every secret other than `latest`, in original order
pub fn partition_for_demotion(
    secrets: &[SealedKeySecret],
    latest: &SealedKeySecret,
) -> Vec<SealedKeySecret> {
    secrets
        .iter()
        .filter(|s| s.name != latest.name)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn key(name: &str, secs: i64) -> SealedKeySecret {
        SealedKeySecret::new("kubeseal", name)
            .with_creation_timestamp(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_latest_is_max_timestamp_regardless_of_order() {
        let secrets = vec![key("k-b", 300), key("k-a", 100), key("k-c", 200)];
        assert_eq!(select_latest_by_creation_time(&secrets).unwrap().name, "k-b");
    }

    #[test]
    fn test_latest_tie_breaks_on_greatest_name() {
        let secrets = vec![key("k-b", 200), key("k-c", 200), key("k-a", 200)];
        assert_eq!(select_latest_by_creation_time(&secrets).unwrap().name, "k-c");

        let reversed: Vec<_> = secrets.into_iter().rev().collect();
        assert_eq!(select_latest_by_creation_time(&reversed).unwrap().name, "k-c");
    }

    #[test]
    fn test_latest_empty_is_error() {
        assert_eq!(
            select_latest_by_creation_time(&[]).unwrap_err(),
            NotFoundError::Empty
        );
    }

    #[test]
    fn test_scan_finds_later_match() {
        let secrets = vec![key("other", 1), key("sealed-secrets-key-x", 2)];
        let active =
            select_active_by_prefix(&secrets, "sealed-secrets-key", SelectionMode::Scan).unwrap();
        assert_eq!(active.name, "sealed-secrets-key-x");
    }

    #[test]
    fn test_first_element_mode_short_circuits() {
        let secrets = vec![key("other", 1), key("sealed-secrets-key-x", 2)];
        let err = select_active_by_prefix(&secrets, "sealed-secrets-key", SelectionMode::FirstElement)
            .unwrap_err();
        assert_eq!(
            err,
            NotFoundError::NoPrefixMatch {
                prefix: "sealed-secrets-key".to_string()
            }
        );
    }

    #[test]
    fn test_partition_never_contains_latest() {
        let secrets = vec![key("k-a", 1), key("k-b", 3), key("k-c", 2)];
        let latest = select_latest_by_creation_time(&secrets).unwrap();
        let demote = partition_for_demotion(&secrets, &latest);
        let names: Vec<_> = demote.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["k-a", "k-c"]);
    }
}
