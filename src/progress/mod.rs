//! Progress reporting for analysis sessions

mod broadcaster;
mod handler;
mod logging;

pub use broadcaster::{ProgressBroadcaster, DEFAULT_CHANNEL_CAPACITY};
pub use handler::{NoOpHandler, ProgressEvent, ProgressHandler, ProgressKind, ProgressRecorder};
pub use logging::LoggingHandler;
