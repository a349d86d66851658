#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgremove-studio
//!
//! A headless upload pipeline for background removal: a presentation layer
//! (browser shell, desktop UI, the bundled CLI) hands it files and renders
//! the [`ViewState`] it publishes.
//!
//! The pipeline runs **upload → validate → load → process → preview →
//! download** as an explicit state machine:
//!
//! - **Validation**: PNG, JPEG and WEBP up to 5 MiB by default
//! - **Loading**: file bytes become a `data:` URI for the original preview
//! - **Processing**: an external [`RemovalBackend`] computes the cut-out while
//!   progress is relayed as a monotonic percentage
//! - **Cancellation**: a new upload or `clear()` cancels in-flight work; late
//!   results and progress are discarded
//! - **Resources**: every result lives behind an [`ObjectHandle`] that is
//!   released on replace, clear and teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_studio::{
//!     BorderKeyBackend, MemorySource, StudioConfig, SubmitOutcome, UploadPipeline,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let pipeline = UploadPipeline::new(StudioConfig::default(), Arc::new(BorderKeyBackend::new()))?;
//!
//! let source = MemorySource::new("photo.jpg", "image/jpeg", upload);
//! if let SubmitOutcome::Completed(handle) = pipeline.submit_file(&source).await? {
//!     println!("result available at {}", handle);
//! }
//!
//! if let Some(download) = pipeline.download() {
//!     assert_eq!(download.file_name, "photo.png");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Watching the view
//!
//! ```rust,no_run
//! # use bgremove_studio::UploadPipeline;
//! # async fn example(pipeline: &UploadPipeline) {
//! let mut views = pipeline.subscribe();
//! while views.changed().await.is_ok() {
//!     let view = views.borrow_and_update().clone();
//!     if view.show_progress {
//!         println!("{}%", view.progress_percent);
//!     }
//! }
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bar and subscriber setup
//! - `webp-support` (default): WebP decoding and output for the built-in backend
//! - `tracing-json`: JSON log output for the CLI

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod inference;
pub mod processor;
pub mod services;
pub mod state;
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod view;

// Public API exports
pub use backends::BorderKeyBackend;
pub use config::{ModelVariant, OutputFormat, RemovalConfig, StudioConfig, StudioConfigBuilder};
pub use controller::{Download, SubmitOutcome, UploadPipeline};
pub use error::{InvalidFileKind, Result, StudioError};
pub use inference::RemovalBackend;
pub use processor::{AdapterOutcome, ProcessorAdapter};
pub use services::{
    describe_stage, ConsoleProgressReporter, FileSource, ImageLoader, MemorySource,
    NoOpProgressReporter, PathSource, ProgressCallback, ProgressMeter, ProgressReporter,
    ProgressUpdate, ResourceManager, ResourceStats,
};
pub use state::{Pane, PipelineEvent, PipelineState, PreviewBackground, Transition};
pub use types::{
    AcceptedFile, Blob, FileDescriptor, ImageKind, JobStatus, LoadedImage, ObjectHandle,
    ProcessingJob, ResultArtifact, SubmissionId, UploadSession,
};
pub use utils::FileValidator;
pub use view::{ImagePane, ViewState};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
