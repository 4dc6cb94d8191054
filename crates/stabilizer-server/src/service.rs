//! StabilizationService: the single coordinator between HTTP handlers and
//! the core and storage crates.
//!
//! The service owns the whole [`StabilizationState`] and the store it is
//! persisted to. Handlers hold the service lock for one call, so a mutation,
//! the evaluation pass it triggers, and the save that follows are never
//! interleaved with another request.
//!
//! A save failure is fatal: the process aborts rather than keep serving a
//! graph that differs from what is on disk.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use stabilizer_core::{
    break_cycles, Atom, LeafPolicy, PackageState, StabilizationState, TicketId,
    UseFlagCombination, Verdict, VoteOutcome, WorkItem,
};
use stabilizer_storage::{GraphStore, StorageError};

use crate::config::ServerConfig;
use crate::schema::StatusResponse;

/// The central service coordinating graph mutations, votes and dispatch.
pub struct StabilizationService {
    state: StabilizationState,
    store: Box<dyn GraphStore + Send>,
    rng: ChaCha8Rng,
    default_policy: LeafPolicy,
}

impl StabilizationService {
    /// Loads the persisted state from `store`, or starts empty.
    ///
    /// The loaded graph is evaluated once; if that rewrites any edge the
    /// normalized graph is saved back immediately.
    pub fn open<S>(store: S, config: &ServerConfig) -> Result<Self, StorageError>
    where
        S: GraphStore + Send + 'static,
    {
        let mut store: Box<dyn GraphStore + Send> = Box::new(store);
        let mut state = store
            .load_state(config.quorum)?
            .unwrap_or_else(|| StabilizationState::new(config.quorum));

        let broken = break_cycles(&mut state.graph);
        for cycle in &broken {
            tracing::warn!(
                parent = %cycle.parent,
                child = %cycle.child,
                "broke dependency cycle in loaded snapshot"
            );
        }
        if !broken.is_empty() {
            store.save_state(&state)?;
        }

        tracing::info!(
            backend = store.backend(),
            packages = state.graph.live_count(),
            sentinels = state.graph.sentinel_count(),
            priority = state.priority.len(),
            "stabilization state loaded"
        );

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(StabilizationService {
            state,
            store,
            rng,
            default_policy: config.policy,
        })
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &StabilizationState {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Graph mutations
    // -----------------------------------------------------------------------

    /// Adds `parent -> child`, re-evaluates, and returns the child's state
    /// as seen from `parent` afterwards.
    pub fn schedule_dependency(&mut self, parent: &Atom, child: &Atom) -> PackageState {
        let outcome = self.state.schedule_dependency(parent, child);
        for cycle in &outcome.broken {
            tracing::info!(
                parent = %cycle.parent,
                child = %cycle.child,
                sentinel = %cycle.sentinel,
                "broke dependency cycle"
            );
        }
        if outcome.changed() {
            tracing::debug!(parent = %parent, child = %child, created = outcome.created, "dependency added");
            self.persist();
        }
        outcome.child_state
    }

    /// Ensures `atom` exists. Returns true if it was created.
    pub fn add_package(&mut self, atom: &Atom) -> bool {
        let created = self.state.add_package(atom);
        if created {
            tracing::debug!(atom = %atom, "package added");
            self.persist();
        }
        created
    }

    /// Appends a use-flag combination to `atom`.
    pub fn add_combination(&mut self, atom: &Atom, combination: UseFlagCombination) {
        tracing::debug!(atom = %atom, flags = %combination, "combination added");
        self.state.add_combination(atom, combination);
        self.persist();
    }

    // -----------------------------------------------------------------------
    // Votes
    // -----------------------------------------------------------------------

    /// Counts one verdict for `atom`.
    pub fn record_vote(&mut self, atom: &Atom, verdict: Verdict) -> VoteOutcome {
        let outcome = self.state.vote(atom, verdict);
        match outcome.transitioned {
            Some(state) => tracing::info!(atom = %atom, votes = outcome.votes, state = %state, "package state changed"),
            None => tracing::debug!(atom = %atom, votes = outcome.votes, ?verdict, "vote recorded"),
        }
        self.persist();
        outcome
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Picks the next package for a worker.
    ///
    /// Rotating the priority queue is not persisted; a restart resumes the
    /// rotation from the last saved order.
    pub fn request_work(&mut self, policy: Option<LeafPolicy>) -> Option<WorkItem> {
        let policy = policy.unwrap_or(self.default_policy);
        let item = self.state.next_work(policy, &mut self.rng);
        match &item {
            Some(item) => tracing::debug!(work = %item.to_wire(), %policy, "work dispatched"),
            None => tracing::debug!(%policy, "no work available"),
        }
        item
    }

    /// Pins `atom` for `ticket`. Returns false for an already queued pair.
    pub fn prioritize(&mut self, atom: Atom, ticket: TicketId) -> bool {
        let added = self.state.priority.enqueue(atom.clone(), ticket);
        if added {
            tracing::info!(atom = %atom, ticket = %ticket, "package prioritized");
            self.persist();
        }
        added
    }

    /// Removes the first priority entry for `atom`, returning its ticket.
    pub fn retire_priority(&mut self, atom: &str) -> Option<TicketId> {
        let ticket = self.state.priority.retire(atom)?;
        tracing::info!(atom = atom, ticket = %ticket, "priority entry retired");
        self.persist();
        Some(ticket)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn status(&self, pending_correlations: usize) -> StatusResponse {
        let graph = &self.state.graph;
        let mut status = StatusResponse {
            backend: self.store.backend().to_string(),
            packages: graph.live_count(),
            sentinels: graph.sentinel_count(),
            dependencies: graph.edge_count(),
            priority: self.state.priority.len(),
            pending_correlations,
            ..StatusResponse::default()
        };
        for (_, pkg) in graph.iter().filter(|(_, pkg)| !pkg.is_sentinel()) {
            match pkg.state {
                PackageState::Stable => status.stable += 1,
                PackageState::Unstable => status.unstable += 1,
                PackageState::Blocked => status.blocked += 1,
                PackageState::ActingStable => {}
            }
            if pkg.has_combinations() {
                status.with_combinations += 1;
            }
        }
        status
    }

    /// Saves the full state, aborting the process on failure.
    fn persist(&mut self) {
        if let Err(e) = self.store.save_state(&self.state) {
            tracing::error!(
                backend = self.store.backend(),
                error = %e,
                "failed to persist stabilization state, aborting"
            );
            std::process::abort();
        }
    }
}
