use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::status::{Lifecycle, StatusMachine, Tick};

/// Timer cadence and step size for simulated progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub tick: Duration,
    pub min_step: u8,
    pub max_step: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(300),
            min_step: 5,
            max_step: 20,
        }
    }
}

impl ProgressSettings {
    /// Upper bound on ticks needed to finish from 0%.
    pub fn max_ticks(&self) -> u32 {
        u32::from(100u8.div_ceil(self.min_step.max(1)))
    }

    /// Upper bound on the time needed to finish from 0%.
    pub fn max_duration(&self) -> Duration {
        self.tick.saturating_mul(self.max_ticks())
    }
}

/// Entity whose status can be animated by a progress timer.
pub trait Progressable: Send + 'static {
    type Status: Lifecycle;

    fn machine(&self) -> &StatusMachine<Self::Status>;

    fn machine_mut(&mut self) -> &mut StatusMachine<Self::Status>;

    /// Called once when the status flips to success, by a finished timer or a direct transition.
    fn on_completed(&mut self, _rng: &mut StdRng) {}
}

/// Entity plus the epoch of the only timer allowed to drive it.
#[derive(Debug)]
pub struct Driven<T> {
    entity: T,
    epoch: u64,
}

impl<T> Driven<T> {
    pub fn new(entity: T) -> Self {
        Self { entity, epoch: 0 }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut T {
        &mut self.entity
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Invalidates every timer started before this call and returns the new epoch.
    pub fn bump(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }
}

pub type SharedEntity<T> = Arc<Mutex<Driven<T>>>;

/// Spawns a timer that advances `target` by a random step every tick until it leaves the
/// in-flight state. The timer exits as soon as `target` moves to another epoch.
pub fn spawn_progress<T: Progressable>(
    target: SharedEntity<T>,
    epoch: u64,
    settings: ProgressSettings,
    mut rng: StdRng,
) -> JoinHandle<()> {
    let min_step = settings.min_step.max(1);
    let max_step = settings.max_step.max(min_step);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(settings.tick).await;

            let increment = rng.gen_range(min_step..=max_step);
            let mut driven = target.lock().expect("progress target mutex poisoned");
            if driven.epoch() != epoch {
                trace!(epoch, "progress timer superseded");
                break;
            }

            match driven.entity_mut().machine_mut().advance(increment) {
                Tick::Advanced(progress) => trace!(epoch, %progress, "progress advanced"),
                Tick::Completed => {
                    driven.entity_mut().on_completed(&mut rng);
                    let status = driven.entity().machine().status();
                    debug!(epoch, status = status.key(), "progress completed");
                    break;
                }
                Tick::Ignored => break,
            }
        }
    })
}
