//! Best common ancestor finder
//!
//! Finds the merge base of two commits: the commit the candidate branch forked from,
//! against which its changes are diffed.
//!
//! ## Algorithm Overview
//!
//! ### Phase 1: Paint down to common
//!
//! A bidirectional breadth-first walk starts from both commits at once (source first,
//! then target) and follows parents in recorded order:
//! - Every commit carries the set of sides it was reached from
//! - When a dequeued commit has been reached from both sides it becomes a candidate,
//!   and everything below it is painted STALE
//! - The walk ends once no non-stale commit is left in the queue
//!
//! Visit states only ever grow and a commit is only re-queued when its state grows,
//! so every commit is queued a bounded number of times and the walk terminates even
//! on a malformed graph.
//!
//! ### Phase 2: Filter to Best Common Ancestors
//!
//! Apply the **Best Common Ancestor (BCA) Invariant**:
//! > A best common ancestor of commits X and Y is any common ancestor of X and Y
//! > that is not an ancestor of any other common ancestor.
//!
//! Candidates reachable from another candidate are dropped. Of the survivors, the one
//! discovered first by the walk wins, which makes the result deterministic for
//! criss-cross histories with several best common ancestors.
//!
//! ## Debug Logging
//!
//! Per-commit trace events are compiled in with the `debug_merge` feature
//! (`cargo build --features debug_merge`) and emitted at `TRACE` level.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;
use bitflags::bitflags;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Trace logging compiled in only with the `debug_merge` feature
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_merge")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_SOURCE = 0b01;
        const VISITED_FROM_TARGET = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
        const STALE = 0b100; // reachable from a common ancestor
        const RESULT = 0b1000; // recorded as a candidate
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_SOURCE) {
            flags.push("SOURCE");
        }
        if self.contains(VisitState::VISITED_FROM_TARGET) {
            flags.push("TARGET");
        }
        if self.contains(VisitState::STALE) {
            flags.push("STALE");
        }
        if self.contains(VisitState::RESULT) {
            flags.push("RESULT");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of one paint-down walk
struct Painting {
    states: HashMap<ObjectId, VisitState>,
    /// Non-stale candidates, in discovery order
    candidates: Vec<ObjectId>,
}

impl Painting {
    fn state_of(&self, commit_id: &ObjectId) -> VisitState {
        self.states
            .get(commit_id)
            .copied()
            .unwrap_or(VisitState::NONE)
    }
}

/// Walk queue that counts its entries whose commit is not STALE
///
/// A commit may be queued more than once, and may turn STALE while queued; both
/// are tracked so the walk never rescans the queue.
#[derive(Debug, Default)]
struct PaintQueue {
    entries: VecDeque<ObjectId>,
    occurrences: HashMap<ObjectId, usize>,
    non_stale: usize,
}

impl PaintQueue {
    fn push(&mut self, commit_id: ObjectId, state: VisitState) {
        if !state.contains(VisitState::STALE) {
            self.non_stale += 1;
        }
        *self.occurrences.entry(commit_id.clone()).or_insert(0) += 1;
        self.entries.push_back(commit_id);
    }

    fn pop(&mut self, states: &HashMap<ObjectId, VisitState>) -> Option<ObjectId> {
        let commit_id = self.entries.pop_front()?;

        if let Some(count) = self.occurrences.get_mut(&commit_id) {
            *count -= 1;
            if *count == 0 {
                self.occurrences.remove(&commit_id);
            }
        }
        if !states
            .get(&commit_id)
            .is_some_and(|state| state.contains(VisitState::STALE))
        {
            self.non_stale = self.non_stale.saturating_sub(1);
        }

        Some(commit_id)
    }

    /// Record that `commit_id` turned STALE, with every queued copy of it
    fn mark_stale(&mut self, commit_id: &ObjectId) {
        let queued = self.occurrences.get(commit_id).copied().unwrap_or(0);
        self.non_stale = self.non_stale.saturating_sub(queued);
    }

    fn has_non_stale(&self) -> bool {
        self.non_stale > 0
    }
}

/// Finds the best common ancestor of two commits
///
/// The commit loader is any function returning a commit's parents, so the walk runs
/// the same against the object database and an in-memory test graph. Loader errors
/// abort the walk.
pub struct BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Find the best common ancestor of `source_commit_id` and `target_commit_id`
    ///
    /// Returns `None` when the histories are disjoint.
    ///
    /// ```rust,ignore
    /// // Trunk advanced after the branch was cut:
    /// //   A <- B <- T1 <- T2   (trunk)
    /// //         \
    /// //          C1            (candidate)
    /// let bca = finder.find_best_common_ancestor(&c1, &t2)?;
    /// assert_eq!(bca, Some(b));
    /// ```
    pub fn find_best_common_ancestor(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> Result<Option<ObjectId>> {
        if source_commit_id == target_commit_id {
            return Ok(Some(source_commit_id.clone()));
        }

        let candidates = self
            .paint_down_to_common(source_commit_id, &[target_commit_id])?
            .candidates;

        debug_log!(
            "common ancestors: {}",
            candidates
                .iter()
                .map(|oid| oid.as_ref())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if candidates.len() <= 1 {
            return Ok(candidates.into_iter().next());
        }

        let redundant = self.find_redundant(&candidates)?;

        debug_log!(
            "redundant ancestors: {}",
            redundant
                .iter()
                .map(|oid| oid.as_ref())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(candidates
            .into_iter()
            .find(|candidate| !redundant.contains(candidate)))
    }

    fn paint_down_to_common(
        &self,
        source_commit_id: &ObjectId,
        target_commit_ids: &[&ObjectId],
    ) -> Result<Painting> {
        let mut states = HashMap::<ObjectId, VisitState>::new();
        let mut queue = PaintQueue::default();
        let mut candidates = Vec::new();

        states.insert(source_commit_id.clone(), VisitState::VISITED_FROM_SOURCE);
        queue.push(source_commit_id.clone(), VisitState::VISITED_FROM_SOURCE);

        for &target_commit_id in target_commit_ids {
            let state = states
                .entry(target_commit_id.clone())
                .or_insert(VisitState::NONE);
            *state |= VisitState::VISITED_FROM_TARGET;
            let state = *state;
            queue.push(target_commit_id.clone(), state);
        }

        while queue.has_non_stale() {
            let Some(commit_id) = queue.pop(&states) else {
                break;
            };

            let current_state = states
                .get(&commit_id)
                .copied()
                .unwrap_or(VisitState::NONE);
            let mut flags = current_state & (VisitState::VISITED_FROM_BOTH | VisitState::STALE);

            debug_log!("processing commit {}: state={}", &commit_id, current_state);

            if flags == VisitState::VISITED_FROM_BOTH {
                if !current_state.contains(VisitState::RESULT) {
                    states.insert(commit_id.clone(), current_state | VisitState::RESULT);
                    candidates.push(commit_id.clone());
                }
                flags |= VisitState::STALE;
            }

            let commit = (self.commit_loader)(&commit_id)?;
            for parent_id in commit.parents {
                let parent_state = states.get(&parent_id).copied().unwrap_or(VisitState::NONE);
                if parent_state.contains(flags) {
                    continue;
                }

                let new_state = parent_state | flags;
                if new_state.contains(VisitState::STALE) && !parent_state.contains(VisitState::STALE)
                {
                    queue.mark_stale(&parent_id);
                }
                states.insert(parent_id.clone(), new_state);
                queue.push(parent_id, new_state);
            }
        }

        let candidates = candidates
            .into_iter()
            .filter(|oid| {
                !states
                    .get(oid)
                    .is_some_and(|state| state.contains(VisitState::STALE))
            })
            .collect();

        Ok(Painting { states, candidates })
    }

    /// Candidates that are ancestors of another candidate
    fn find_redundant(&self, candidates: &[ObjectId]) -> Result<HashSet<ObjectId>> {
        let mut redundant = HashSet::<ObjectId>::new();

        for commit in candidates {
            if redundant.contains(commit) {
                continue;
            }

            let others = candidates
                .iter()
                .filter(|other| *other != commit && !redundant.contains(*other))
                .collect::<Vec<_>>();
            if others.is_empty() {
                continue;
            }

            let painting = self.paint_down_to_common(commit, &others)?;

            if painting
                .state_of(commit)
                .contains(VisitState::VISITED_FROM_TARGET)
            {
                redundant.insert(commit.clone());
            }

            for other in others {
                if painting
                    .state_of(other)
                    .contains(VisitState::VISITED_FROM_SOURCE)
                {
                    redundant.insert(other.clone());
                }
            }
        }

        Ok(redundant)
    }
}
