//! Test doubles shared by the daemon unit and behavioural suites.

mod doubles;
mod reporter;
mod world;

pub use doubles::{
    FailingConfigLoader, FailingOpener, LoopbackOpener, RecordingDaemonizer, RecordingRegistrar,
};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::DispatchWorld;
