//! Timer-driven progress for in-flight statuses.
//!
//! Every entity owns at most one timer. Timers are tokio tasks held in a [`TimerSlot`]; an epoch
//! stored next to the entity lets a superseded timer notice it lost ownership even if it was
//! already past its last await point when it was aborted.

mod simulator;
mod timer;
mod tracker;

pub use simulator::{spawn_progress, Driven, ProgressSettings, Progressable, SharedEntity};
pub use timer::TimerSlot;
pub use tracker::{EntityTracker, Tracked, TrackerError};
