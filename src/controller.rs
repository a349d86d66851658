//! Upload pipeline controller
//!
//! [`UploadPipeline`] wires the validator, loader, processor adapter and
//! resource manager together and publishes a [`ViewState`] after every
//! transition. State sits behind one mutex that is never held across an
//! `.await`; all suspension happens in the loader and the backend call.

use crate::{
    config::StudioConfig,
    error::{Result, StudioError},
    inference::RemovalBackend,
    processor::{AdapterOutcome, ProcessorAdapter},
    services::{
        format::download_file_name,
        io::{FileSource, ImageLoader},
        progress::ProgressReporter,
        resources::{ResourceManager, ResourceStats},
    },
    state::{Pane, PipelineEvent, PipelineState, PreviewBackground, Transition},
    tracing_config::{events, spans},
    types::{Blob, JobStatus, ObjectHandle, SubmissionId, UploadSession},
    utils::FileValidator,
    view::ViewState,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// How an accepted submission ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The result is installed and downloadable under this handle
    Completed(ObjectHandle),
    /// The submission was superseded, cleared or torn down before it finished
    Discarded,
}

/// A processed result ready to be saved
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub blob: Arc<Blob>,
}

#[derive(Debug, Default)]
struct Inner {
    state: PipelineState,
    resources: ResourceManager,
    next_submission: u64,
}

/// Headless upload → validate → load → process → preview → download pipeline
pub struct UploadPipeline {
    config: StudioConfig,
    validator: FileValidator,
    loader: ImageLoader,
    adapter: ProcessorAdapter,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<ViewState>,
}

impl UploadPipeline {
    /// Create a pipeline around `backend`
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` does not validate
    pub fn new(config: StudioConfig, backend: Arc<dyn RemovalBackend>) -> Result<Self> {
        config.validate()?;
        let adapter = ProcessorAdapter::new(backend, config.removal.clone(), config.min_visible_progress);
        let (view_tx, _) = watch::channel(ViewState::project(
            &PipelineState::default(),
            None,
            config.removal.output_format,
        ));

        Ok(Self {
            validator: FileValidator::from_config(&config),
            loader: ImageLoader::new(),
            adapter,
            inner: Mutex::new(Inner::default()),
            view_tx,
            config,
        })
    }

    /// Route progress, completion and errors to `reporter` as well as the view
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.adapter.set_reporter(reporter);
        self
    }

    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.adapter.backend_name()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the lock and publish the resulting view before unlocking
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner);
        let view = ViewState::project(
            &inner.state,
            inner.resources.current(),
            self.config.removal.output_format,
        );
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        result
    }

    /// Submit one file.
    ///
    /// An accepted file supersedes whatever is in flight: the previous token
    /// is cancelled and the previous artifact released before reading starts.
    /// Every error is also surfaced in the view.
    ///
    /// # Errors
    /// - `InvalidFile` when validation rejects the descriptor (nothing else changes)
    /// - `ReadFailure` when the bytes cannot be read
    /// - `ProcessingFailure` when the backend fails
    pub async fn submit_file(&self, source: &dyn FileSource) -> Result<SubmitOutcome> {
        let descriptor = source.descriptor();
        let span = spans::submission(&descriptor.name, descriptor.size_bytes);

        async {
            let accepted = match self.validator.validate(&descriptor) {
                Ok(accepted) => accepted,
                Err(e) => {
                    events::file_rejected(&descriptor.name, &e.to_string());
                    self.update(|inner| {
                        inner.state.apply(PipelineEvent::Rejected {
                            reason: e.to_string(),
                        })
                    });
                    return Err(e);
                },
            };

            let token = CancellationToken::new();
            let submission = self.update(|inner| {
                inner.next_submission += 1;
                let submission = SubmissionId(inner.next_submission);
                if let Some(previous) = &inner.state.session {
                    debug!(previous = %previous.id, "Superseding previous submission");
                    previous.token.cancel();
                }
                inner.resources.retire();
                inner.state.apply(PipelineEvent::Submitted {
                    session: UploadSession::new(submission, &accepted, token.clone()),
                });
                submission
            });
            tracing::Span::current().record("id", tracing::field::display(submission));
            info!(kind = %accepted.kind, "File accepted");

            let image = match self.loader.load(&accepted, source).await {
                Ok(image) => image,
                Err(e) => {
                    let applied = self.update(|inner| {
                        inner.state.apply(PipelineEvent::ReadFailed {
                            submission,
                            reason: e.to_string(),
                        })
                    });
                    return if applied.is_applied() {
                        warn!(error = %e, "Read failed");
                        Err(e)
                    } else {
                        Ok(SubmitOutcome::Discarded)
                    };
                },
            };

            let started = self.update(|inner| {
                if inner
                    .state
                    .apply(PipelineEvent::Loaded { submission, image: image.clone() })
                    .is_applied()
                {
                    inner.state.apply(PipelineEvent::Started {
                        submission,
                        token: token.clone(),
                        percent: self.config.min_visible_progress,
                    })
                } else {
                    Transition::Ignored
                }
            });
            if !started.is_applied() {
                debug!("Superseded while loading");
                return Ok(SubmitOutcome::Discarded);
            }

            let outcome = self
                .adapter
                .run(&image, &token, |percent| {
                    self.update(|inner| {
                        inner
                            .state
                            .apply(PipelineEvent::Progressed { submission, percent })
                    });
                })
                .await;

            self.finish(submission, outcome)
        }
        .instrument(span)
        .await
    }

    fn finish(&self, submission: SubmissionId, outcome: AdapterOutcome) -> Result<SubmitOutcome> {
        match outcome {
            AdapterOutcome::Produced(blob) => Ok(self.update(|inner| {
                if inner
                    .state
                    .apply(PipelineEvent::Succeeded { submission })
                    .is_applied()
                {
                    SubmitOutcome::Completed(inner.resources.install(blob, submission))
                } else {
                    debug!("Dropping result of a submission that is no longer current");
                    SubmitOutcome::Discarded
                }
            })),
            AdapterOutcome::Failed(e) => {
                let applied = self.update(|inner| {
                    inner.state.apply(PipelineEvent::Failed {
                        submission,
                        reason: e.to_string(),
                    })
                });
                if applied.is_applied() {
                    Err(e)
                } else {
                    Ok(SubmitOutcome::Discarded)
                }
            },
            AdapterOutcome::Cancelled => {
                self.update(|inner| inner.state.apply(PipelineEvent::Cancelled { submission }));
                Ok(SubmitOutcome::Discarded)
            },
        }
    }

    /// Submit the first file of a multi-file gesture and ignore the rest.
    /// Returns `None` when `sources` is empty.
    pub async fn submit_first<S: FileSource>(&self, sources: &[S]) -> Option<Result<SubmitOutcome>> {
        let (first, rest) = sources.split_first()?;
        if !rest.is_empty() {
            debug!(ignored = rest.len(), "Only the first file is processed");
        }
        Some(self.submit_file(first).await)
    }

    /// Cancel in-flight work, release the artifact and reset to idle.
    /// Returns whether an artifact was released.
    pub fn clear(&self) -> bool {
        self.update(|inner| {
            if let Some(session) = &inner.state.session {
                session.token.cancel();
            }
            inner.state.apply(PipelineEvent::Cleared);
            inner.resources.retire()
        })
    }

    /// Release every handle and cancel in-flight work. Safe to call repeatedly.
    pub fn teardown(&self) -> usize {
        self.update(|inner| {
            if let Some(session) = &inner.state.session {
                session.token.cancel();
            }
            inner.state.apply(PipelineEvent::Cleared);
            inner.resources.release_all()
        })
    }

    /// The current result, or `None` when there is nothing to download
    #[must_use]
    pub fn download(&self) -> Option<Download> {
        let inner = self.lock();
        let session = inner.state.session.as_ref()?;
        let artifact = inner
            .resources
            .current()
            .filter(|a| a.session == session.id)?;
        let blob = inner.resources.resolve(artifact.handle)?;
        Some(Download {
            file_name: download_file_name(&session.file_name, self.config.removal.output_format),
            blob,
        })
    }

    /// Write the current result into `dir`. Returns the written path, or
    /// `None` when there is nothing to download.
    ///
    /// # Errors
    /// - `Io` if the file cannot be written
    pub async fn save_download<P: AsRef<Path>>(&self, dir: P) -> Result<Option<PathBuf>> {
        let Some(download) = self.download() else {
            return Ok(None);
        };
        let path = dir.as_ref().join(&download.file_name);
        tokio::fs::write(&path, &download.blob.bytes)
            .await
            .map_err(|e| StudioError::file_io_error("write result", &path, &e))?;
        events::download_saved(&path, download.blob.len());
        Ok(Some(path))
    }

    /// Snapshot of the current view
    #[must_use]
    pub fn view(&self) -> ViewState {
        self.view_tx.borrow().clone()
    }

    /// Receive every published view
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Record that a pane finished painting its current source
    pub fn mark_painted(&self, pane: Pane) -> bool {
        self.update(|inner| inner.state.apply(PipelineEvent::Painted(pane)))
            .is_applied()
    }

    pub fn toggle_preview_background(&self) -> PreviewBackground {
        self.update(|inner| {
            inner.state.apply(PipelineEvent::PreviewBackgroundToggled);
            inner.state.preview_background
        })
    }

    #[must_use]
    pub fn resource_stats(&self) -> ResourceStats {
        self.lock().resources.stats()
    }

    #[must_use]
    pub fn job_status(&self) -> JobStatus {
        self.lock().state.status()
    }

    /// The surfaced error message, if any
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().state.error.clone()
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = &inner.state.session {
            session.token.cancel();
        }
    }
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("backend", &self.adapter.backend_name())
            .field("status", &self.job_status())
            .finish_non_exhaustive()
    }
}
