use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::simulator::{spawn_progress, Driven, ProgressSettings, Progressable, SharedEntity};
use super::timer::TimerSlot;
use crate::status::{Lifecycle, TransitionError};

/// Entity that can be tracked by id.
pub trait Tracked: Progressable + Clone {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("'{0}' already exists")]
    Conflict(String),
    #[error("tracker has been disposed")]
    Disposed,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

struct Entry<T> {
    shared: SharedEntity<T>,
    timer: TimerSlot,
}

/// Owns a set of entities and the single progress timer each one may have.
///
/// External status changes cancel the running timer before they apply, and a fresh timer is only
/// started when the new status is in flight. Disposing cancels every timer and freezes state.
pub struct EntityTracker<T: Tracked> {
    entries: Mutex<HashMap<T::Id, Entry<T>>>,
    settings: ProgressSettings,
    rng: Mutex<StdRng>,
    disposed: AtomicBool,
}

impl<T: Tracked> EntityTracker<T> {
    pub fn new(settings: ProgressSettings, rng: StdRng) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            settings,
            rng: Mutex::new(rng),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Adds an entity; one seeded in an in-flight state starts animating right away.
    pub fn insert(&self, entity: T) -> Result<T, TrackerError> {
        let mut entries = self.entries.lock().expect("tracker mutex poisoned");
        self.ensure_live()?;

        let id = entity.id().clone();
        if entries.contains_key(&id) {
            return Err(TrackerError::Conflict(id.to_string()));
        }

        let in_flight = entity.machine().is_in_flight();
        let shared = Arc::new(Mutex::new(Driven::new(entity.clone())));
        let mut timer = TimerSlot::default();
        if in_flight {
            let epoch = shared.lock().expect("entity mutex poisoned").bump();
            timer.replace(spawn_progress(
                shared.clone(),
                epoch,
                self.settings,
                self.child_rng(),
            ));
            debug!(%id, "progress timer started for seeded entity");
        }

        entries.insert(id, Entry { shared, timer });
        Ok(entity)
    }

    pub fn get(&self, id: &T::Id) -> Result<T, TrackerError> {
        let entries = self.entries.lock().expect("tracker mutex poisoned");
        let entry = entries
            .get(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        let driven = entry.shared.lock().expect("entity mutex poisoned");
        Ok(driven.entity().clone())
    }

    pub fn list(&self) -> Vec<T> {
        let entries = self.entries.lock().expect("tracker mutex poisoned");
        entries
            .values()
            .map(|entry| {
                entry
                    .shared
                    .lock()
                    .expect("entity mutex poisoned")
                    .entity()
                    .clone()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("tracker mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves an entity to `next`, replacing any running timer. Reaching the success status by
    /// hand runs the same completion hook as a finished timer.
    pub fn set_status(&self, id: &T::Id, next: T::Status) -> Result<T, TrackerError> {
        let mut entries = self.entries.lock().expect("tracker mutex poisoned");
        self.ensure_live()?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let mut completion_rng = (next == T::Status::SUCCESS).then(|| self.child_rng());
        let (snapshot, epoch) = {
            let mut driven = entry.shared.lock().expect("entity mutex poisoned");
            let from = driven.entity().machine().status();
            driven.entity_mut().machine_mut().transition(next)?;
            if let Some(rng) = completion_rng.as_mut() {
                driven.entity_mut().on_completed(rng);
            }
            let epoch = driven.bump();
            debug!(%id, from = from.key(), to = next.key(), "status changed");
            (driven.entity().clone(), epoch)
        };

        entry.timer.cancel();
        if next.is_in_flight() {
            entry.timer.replace(spawn_progress(
                entry.shared.clone(),
                epoch,
                self.settings,
                self.child_rng(),
            ));
        }

        Ok(snapshot)
    }

    /// Applies an edit that does not touch the status.
    pub fn update<F>(&self, id: &T::Id, edit: F) -> Result<T, TrackerError>
    where
        F: FnOnce(&mut T),
    {
        let entries = self.entries.lock().expect("tracker mutex poisoned");
        self.ensure_live()?;
        let entry = entries
            .get(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        let mut driven = entry.shared.lock().expect("entity mutex poisoned");
        edit(driven.entity_mut());
        Ok(driven.entity().clone())
    }

    pub fn remove(&self, id: &T::Id) -> Result<T, TrackerError> {
        let mut entries = self.entries.lock().expect("tracker mutex poisoned");
        self.ensure_live()?;
        let mut entry = entries
            .remove(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        entry.timer.cancel();
        let mut driven = entry.shared.lock().expect("entity mutex poisoned");
        driven.bump();
        Ok(driven.entity().clone())
    }

    /// Number of timers still running.
    pub fn active_timers(&self) -> usize {
        let entries = self.entries.lock().expect("tracker mutex poisoned");
        entries
            .values()
            .filter(|entry| entry.timer.is_active())
            .count()
    }

    /// Cancels every timer. Entities stay readable but no longer change.
    pub fn dispose(&self) {
        let mut entries = self.entries.lock().expect("tracker mutex poisoned");
        self.disposed.store(true, Ordering::Release);
        for entry in entries.values_mut() {
            entry.shared.lock().expect("entity mutex poisoned").bump();
            entry.timer.cancel();
        }
        debug!(entities = entries.len(), "tracker disposed");
    }

    fn ensure_live(&self) -> Result<(), TrackerError> {
        if self.is_disposed() {
            Err(TrackerError::Disposed)
        } else {
            Ok(())
        }
    }

    fn child_rng(&self) -> StdRng {
        let mut rng = self.rng.lock().expect("tracker rng mutex poisoned");
        StdRng::seed_from_u64(rng.gen())
    }
}

impl<T: Tracked> Drop for EntityTracker<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
