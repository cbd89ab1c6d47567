//! # Recorder
//!
//! The fetch → filter → synthesize → store sequence for one host event.
//!
//! Every method takes `&mut self`, so one event is handled start to finish
//! before the next one reads the document.

use crate::blueprint::Blueprint;
use crate::event::{HostEvent, Mutation, PostSnapshot};
use crate::filter::{MutationFilter, Verdict};
use crate::storage::SettingsStore;
use crate::store::BlueprintStore;
use crate::synthesizer::{Decision, Synthesizer};
use crate::types::{RecorderError, RequestContext};

/// Records host events into the persisted blueprint.
#[derive(Debug)]
pub struct Recorder<S> {
    store: BlueprintStore<S>,
    seed: Option<Blueprint>,
}

impl<S: SettingsStore> Recorder<S> {
    /// Open a recorder over `settings`, initializing the working blueprint
    /// from `seed` when nothing is persisted yet.
    pub fn open(settings: S, seed: Option<Blueprint>) -> Result<Self, RecorderError> {
        let mut store = BlueprintStore::new(settings);
        store.initialize(seed.as_ref())?;
        Ok(Self { store, seed })
    }

    /// Handle one hook invocation.
    ///
    /// Returns `None` for a pre-update snapshot, which only fills the
    /// snapshot slot.
    pub fn handle(
        &mut self,
        event: &HostEvent,
        ctx: &RequestContext,
    ) -> Result<Option<Decision>, RecorderError> {
        match event {
            HostEvent::PostUpdating(snapshot) => {
                self.snapshot_post(snapshot)?;
                Ok(None)
            }
            HostEvent::Mutation(mutation) => self.record(mutation, ctx).map(Some),
        }
    }

    /// Filter a mutation and, if it is signal, apply it and persist.
    pub fn record(
        &mut self,
        mutation: &Mutation,
        ctx: &RequestContext,
    ) -> Result<Decision, RecorderError> {
        // Only an update of the snapshotted post consumes the slot, even when
        // it records nothing. Saves of other posts (revisions, creates) leave
        // it for the update that follows them.
        let snapshot = match mutation {
            Mutation::PostSaved(save) if save.update => {
                self.store.take_snapshot_for(save.post_id)?
            }
            _ => None,
        };

        if let Verdict::Suppress(reason) = MutationFilter::evaluate(mutation, ctx) {
            return Ok(Decision::Suppressed(reason));
        }

        let mut blueprint = self.fetch()?;
        let decision = Synthesizer::apply_mutation(&mut blueprint, mutation, snapshot.as_ref());
        if decision.changed() {
            self.store.save(&mut blueprint)?;
        }
        Ok(decision)
    }

    /// Store the pre-update copy of a post.
    pub fn snapshot_post(&mut self, snapshot: &PostSnapshot) -> Result<(), RecorderError> {
        self.store.put_snapshot(snapshot)
    }

    /// The working blueprint, markers included.
    pub fn blueprint(&self) -> Result<Blueprint, RecorderError> {
        self.fetch()
    }

    /// The seed the recorder was opened with.
    #[must_use]
    pub fn seed(&self) -> Option<&Blueprint> {
        self.seed.as_ref()
    }

    /// Throw the working blueprint away and start again from the seed.
    pub fn reset(&mut self) -> Result<Blueprint, RecorderError> {
        self.store.reset(self.seed.as_ref())
    }

    /// The underlying settings backend.
    pub fn settings(&self) -> &S {
        self.store.settings()
    }

    fn fetch(&self) -> Result<Blueprint, RecorderError> {
        Ok(self.store.load()?.unwrap_or_else(|| {
            self.seed.clone().unwrap_or_default()
        }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
