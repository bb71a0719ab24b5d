//! Kernel telemetry.
//!
//! Events are written by the reactor after each stage of a tick and only
//! ever read by hosts and tests. Nothing under `belief`, `free_energy` or
//! `decision` may consult them.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::TelemetryEvent;
pub use metrics::TelemetrySnapshot;
pub use recorder::TelemetryRecorder;
