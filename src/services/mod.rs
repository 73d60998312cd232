//! Service layer
//!
//! Infrastructure concerns (URI resolution, image codecs, file output and
//! progress reporting) kept apart from the compositing logic.

pub mod io;
pub mod progress;

pub use io::{ContentResolver, ImageIOService, ImageSource};
pub use progress::{
    NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
    TracingProgressReporter,
};
