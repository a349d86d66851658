//! Service layer
//!
//! Infrastructure pieces used by the upload pipeline: file sources and
//! loading, progress mapping and reporting, object handle ownership, and
//! naming helpers.

pub mod format;
pub mod io;
pub mod progress;
pub mod resources;

pub use io::{FileSource, ImageLoader, MemorySource, PathSource};
pub use progress::{
    describe_stage, ConsoleProgressReporter, NoOpProgressReporter, ProgressCallback,
    ProgressMeter, ProgressReporter, ProgressUpdate,
};
pub use resources::{ResourceManager, ResourceStats};
