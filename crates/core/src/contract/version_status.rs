//! The version lifecycle state machine (spec §4.1) — the central artifact
//! of this system. Every transition the metadata store accepts is encoded
//! here so `update-status` has exactly one place to consult.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A version's position in its lifecycle.
///
/// Mirrors the teacher's `Version` enum shape (variants with no payload,
/// `Ord`-free — this state machine is a graph, not a counter): see
/// [`VersionStatus::can_transition_to`] for the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStatus {
    /// Just created; no entries loaded yet.
    Preparing,
    /// The worker has provisioned whatever `prepare` needs; entries may load.
    AwaitingEntries,
    /// A `save` was requested; the worker is finalizing.
    Saving,
    /// Finalized and durable, but not yet the dataset's active version.
    Saved,
    /// A `publish` was requested; the worker is promoting.
    Publishing,
    /// Currently the one published version of its dataset (invariant 4).
    Published,
    /// Terminal: explicitly discarded.
    Discarded,
    /// Terminal: a handler failed it.
    Failed,
}

impl VersionStatus {
    /// The initial status assigned by `create-version`.
    pub const INITIAL: VersionStatus = VersionStatus::Preparing;

    /// Whether `self -> target` is one of the edges in spec §4.1's graph.
    pub fn can_transition_to(self, target: VersionStatus) -> bool {
        use VersionStatus::*;
        matches!(
            (self, target),
            (Preparing, AwaitingEntries | Discarded | Failed)
                | (AwaitingEntries, Saving | Discarded | Failed)
                | (Saving, Saved | Discarded | Failed)
                | (Saved, Publishing | Published | Discarded | Failed)
                | (Publishing, Published | Discarded | Failed)
                | (Published, Saved)
        )
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, VersionStatus::Discarded | VersionStatus::Failed)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Preparing => "preparing",
            VersionStatus::AwaitingEntries => "awaiting-entries",
            VersionStatus::Saving => "saving",
            VersionStatus::Saved => "saved",
            VersionStatus::Publishing => "publishing",
            VersionStatus::Published => "published",
            VersionStatus::Discarded => "discarded",
            VersionStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VersionStatus::*;

    #[test]
    fn preparing_can_only_reach_awaiting_entries_discarded_or_failed() {
        assert!(Preparing.can_transition_to(AwaitingEntries));
        assert!(Preparing.can_transition_to(Discarded));
        assert!(Preparing.can_transition_to(Failed));
        assert!(!Preparing.can_transition_to(Saving));
        assert!(!Preparing.can_transition_to(Saved));
        assert!(!Preparing.can_transition_to(Published));
        assert!(!Preparing.can_transition_to(Preparing));
    }

    #[test]
    fn published_can_only_revert_to_saved() {
        assert!(Published.can_transition_to(Saved));
        assert!(!Published.can_transition_to(Publishing));
        assert!(!Published.can_transition_to(Discarded));
        assert!(!Published.can_transition_to(Failed));
    }

    #[test]
    fn saved_has_three_forward_edges_plus_terminal_edges() {
        assert!(Saved.can_transition_to(Publishing));
        assert!(Saved.can_transition_to(Published));
        assert!(Saved.can_transition_to(Discarded));
        assert!(Saved.can_transition_to(Failed));
        assert!(!Saved.can_transition_to(AwaitingEntries));
        assert!(!Saved.can_transition_to(Preparing));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for target in [
            Preparing,
            AwaitingEntries,
            Saving,
            Saved,
            Publishing,
            Published,
            Discarded,
            Failed,
        ] {
            assert!(!Discarded.can_transition_to(target));
            assert!(!Failed.can_transition_to(target));
        }
        assert!(Discarded.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Saved.is_terminal());
    }

    #[test]
    fn display_matches_the_kebab_case_wire_form() {
        assert_eq!(AwaitingEntries.to_string(), "awaiting-entries");
        assert_eq!(Published.to_string(), "published");
    }

    proptest::proptest! {
        #[test]
        fn a_random_walk_of_legal_edges_never_leaves_a_terminal_state(
            steps in proptest::collection::vec(0..8u8, 1..32)
        ) {
            let all = [Preparing, AwaitingEntries, Saving, Saved, Publishing, Published, Discarded, Failed];
            let mut state = Preparing;
            for step in steps {
                let target = all[step as usize % all.len()];
                if state.can_transition_to(target) {
                    // taking a legal edge out of a terminal state must be impossible
                    prop_assert!(!state.is_terminal());
                    state = target;
                }
            }
        }
    }
}
