pub mod config;
pub mod error;
pub mod portal;
pub mod progress;
pub mod status;
pub mod sync;
pub mod telemetry;

pub use error::AppError;
