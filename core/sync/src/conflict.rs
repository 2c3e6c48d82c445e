//! Last-write-wins conflict resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side's version survives a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Local,
    Remote,
}

impl Winner {
    /// Short label for log lines and conflict notes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Local => "local",
            Winner::Remote => "remote",
        }
    }
}

/// Timestamp-based whole-record resolver.
///
/// Pure and deterministic: the later `updated_at` wins. Equal timestamps
/// fall to the remote, so every client converges on the authority's copy
/// without needing a secondary clock. The losing side's fields are
/// discarded entirely; there is no field-level merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    /// Decide the winner from the two modification timestamps.
    pub fn resolve(
        &self,
        local_updated_at: DateTime<Utc>,
        remote_updated_at: DateTime<Utc>,
    ) -> Winner {
        if local_updated_at > remote_updated_at {
            Winner::Local
        } else {
            Winner::Remote
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    #[test]
    fn test_strictly_newer_local_wins() {
        let resolver = ConflictResolver::new();
        let now = Utc::now();
        assert_eq!(
            resolver.resolve(now, now - Duration::seconds(1)),
            Winner::Local
        );
    }

    #[test]
    fn test_strictly_newer_remote_wins() {
        let resolver = ConflictResolver::new();
        let now = Utc::now();
        assert_eq!(
            resolver.resolve(now - Duration::seconds(1), now),
            Winner::Remote
        );
    }

    #[test]
    fn test_tie_goes_to_remote() {
        let resolver = ConflictResolver::new();
        let now = Utc::now();
        assert_eq!(resolver.resolve(now, now), Winner::Remote);
    }

    fn timestamps() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap())
    }

    proptest! {
        #[test]
        fn prop_resolution_is_deterministic(a in timestamps(), b in timestamps()) {
            let resolver = ConflictResolver::new();
            prop_assert_eq!(resolver.resolve(a, b), resolver.resolve(a, b));
        }

        #[test]
        fn prop_distinct_timestamps_select_the_same_version(a in timestamps(), b in timestamps()) {
            prop_assume!(a != b);
            let resolver = ConflictResolver::new();
            // Swapping which side holds a version must not change which
            // version's content wins.
            let forward_picks_first = resolver.resolve(a, b) == Winner::Local;
            let swapped_picks_first = resolver.resolve(b, a) == Winner::Remote;
            prop_assert_eq!(forward_picks_first, swapped_picks_first);
        }

        #[test]
        fn prop_ties_always_favor_the_authority(t in timestamps()) {
            let resolver = ConflictResolver::new();
            prop_assert_eq!(resolver.resolve(t, t), Winner::Remote);
        }
    }
}
