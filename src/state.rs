//! Pipeline state and its transitions
//!
//! All mutation of the session, job and error message goes through
//! [`PipelineState::apply`]. Events that belong to a submission which is no
//! longer current (or whose token already fired) are ignored, which is how
//! late results and progress from superseded work get discarded.

use crate::types::{JobStatus, LoadedImage, ProcessingJob, SubmissionId, UploadSession};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One of the two preview panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    Original,
    Processed,
}

/// Backdrop drawn behind the processed preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBackground {
    #[default]
    Checkerboard,
    Solid,
}

impl PreviewBackground {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Checkerboard => Self::Solid,
            Self::Solid => Self::Checkerboard,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Validation rejected a file; nothing else changes
    Rejected { reason: String },
    /// A file was accepted and replaces the current session
    Submitted { session: UploadSession },
    /// The loader finished reading the file
    Loaded {
        submission: SubmissionId,
        image: LoadedImage,
    },
    /// The loader failed
    ReadFailed {
        submission: SubmissionId,
        reason: String,
    },
    /// A processing job started for the session
    Started {
        submission: SubmissionId,
        token: CancellationToken,
        percent: u8,
    },
    Progressed {
        submission: SubmissionId,
        percent: u8,
    },
    Succeeded { submission: SubmissionId },
    Failed {
        submission: SubmissionId,
        reason: String,
    },
    Cancelled { submission: SubmissionId },
    Cleared,
    Painted(Pane),
    PreviewBackgroundToggled,
}

/// Whether an event changed the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

impl Transition {
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    fn from_bool(applied: bool) -> Self {
        if applied {
            Self::Applied
        } else {
            Self::Ignored
        }
    }
}

/// Everything the pipeline knows about the current upload
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub session: Option<UploadSession>,
    pub job: Option<ProcessingJob>,
    /// The single message surfaced to the user
    pub error: Option<String>,
    pub original_loaded: bool,
    pub processed_loaded: bool,
    pub preview_background: PreviewBackground,
}

impl PipelineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.job.as_ref().map_or(JobStatus::Idle, |job| job.status)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    /// Display percentage; zero unless a job is running
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        match &self.job {
            Some(job) if job.status == JobStatus::Running => job.progress_percent,
            _ => 0,
        }
    }

    /// Whether `submission` is the live session
    #[must_use]
    pub fn is_current(&self, submission: SubmissionId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.id == submission && !s.token.is_cancelled())
    }

    fn running_job_mut(&mut self, submission: SubmissionId) -> Option<&mut ProcessingJob> {
        self.job.as_mut().filter(|job| {
            job.submission == submission
                && job.status == JobStatus::Running
                && !job.token.is_cancelled()
        })
    }

    fn current_session_mut(&mut self, submission: SubmissionId) -> Option<&mut UploadSession> {
        self.session
            .as_mut()
            .filter(|s| s.id == submission && !s.token.is_cancelled())
    }

    /// Apply one event
    pub fn apply(&mut self, event: PipelineEvent) -> Transition {
        let transition = match event {
            PipelineEvent::Rejected { reason } => {
                self.error = Some(reason);
                Transition::Applied
            },

            // A job still running is superseded: it stays visible as cancelled
            // until the new submission starts its own job
            PipelineEvent::Submitted { session } => {
                self.session = Some(session);
                self.job = self
                    .job
                    .take()
                    .filter(|job| job.status == JobStatus::Running)
                    .map(|job| ProcessingJob {
                        status: JobStatus::Cancelled,
                        progress_percent: 0,
                        ..job
                    });
                self.error = None;
                self.original_loaded = false;
                self.processed_loaded = false;
                Transition::Applied
            },

            PipelineEvent::Loaded { submission, image } => {
                let applied = match self.current_session_mut(submission) {
                    Some(session) => {
                        session.source_image = Some(image);
                        true
                    },
                    None => false,
                };
                if applied {
                    self.original_loaded = false;
                }
                Transition::from_bool(applied)
            },

            PipelineEvent::ReadFailed { submission, reason } => {
                if self.is_current(submission) {
                    self.error = Some(reason);
                    Transition::Applied
                } else {
                    Transition::Ignored
                }
            },

            PipelineEvent::Started {
                submission,
                token,
                percent,
            } => {
                if self.is_current(submission) && !self.is_running() {
                    self.job = Some(ProcessingJob {
                        submission,
                        status: JobStatus::Running,
                        progress_percent: percent.min(100),
                        token,
                    });
                    self.processed_loaded = false;
                    Transition::Applied
                } else {
                    Transition::Ignored
                }
            },

            PipelineEvent::Progressed {
                submission,
                percent,
            } => match self.running_job_mut(submission) {
                Some(job) => {
                    let next = job.progress_percent.max(percent).min(100);
                    let changed = next != job.progress_percent;
                    job.progress_percent = next;
                    Transition::from_bool(changed)
                },
                None => Transition::Ignored,
            },

            PipelineEvent::Succeeded { submission } => match self.running_job_mut(submission) {
                Some(job) => {
                    job.status = JobStatus::Succeeded;
                    job.progress_percent = 0;
                    self.processed_loaded = false;
                    Transition::Applied
                },
                None => Transition::Ignored,
            },

            PipelineEvent::Failed { submission, reason } => match self.running_job_mut(submission) {
                Some(job) => {
                    job.status = JobStatus::Failed;
                    job.progress_percent = 0;
                    self.error = Some(reason);
                    Transition::Applied
                },
                None => Transition::Ignored,
            },

            // A cancelled job's token has fired, so it is matched on id alone
            PipelineEvent::Cancelled { submission } => match self.job.as_mut() {
                Some(job) if job.submission == submission && job.status == JobStatus::Running => {
                    job.status = JobStatus::Cancelled;
                    job.progress_percent = 0;
                    Transition::Applied
                },
                _ => Transition::Ignored,
            },

            PipelineEvent::Cleared => {
                let preview_background = self.preview_background;
                *self = Self {
                    preview_background,
                    ..Self::default()
                };
                Transition::Applied
            },

            PipelineEvent::Painted(Pane::Original) => {
                let has_source = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.source_image.is_some());
                if has_source && !self.original_loaded {
                    self.original_loaded = true;
                    Transition::Applied
                } else {
                    Transition::Ignored
                }
            },

            PipelineEvent::Painted(Pane::Processed) => {
                if self.status() == JobStatus::Succeeded && !self.processed_loaded {
                    self.processed_loaded = true;
                    Transition::Applied
                } else {
                    Transition::Ignored
                }
            },

            PipelineEvent::PreviewBackgroundToggled => {
                self.preview_background = self.preview_background.toggled();
                Transition::Applied
            },
        };

        trace!(?transition, status = ?self.status(), "Applied pipeline event");
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcceptedFile, ImageKind};

    fn session(id: u64) -> UploadSession {
        let file = AcceptedFile {
            name: format!("file{}.png", id),
            size_bytes: 100,
            kind: ImageKind::Png,
        };
        UploadSession::new(SubmissionId(id), &file, CancellationToken::new())
    }

    fn image() -> LoadedImage {
        LoadedImage::new(ImageKind::Png, vec![1, 2, 3])
    }

    /// State with session `id` loaded and its job running at 4%
    fn running(id: u64) -> PipelineState {
        let mut state = PipelineState::new();
        let session = session(id);
        let token = session.token.clone();
        state.apply(PipelineEvent::Submitted { session });
        state.apply(PipelineEvent::Loaded {
            submission: SubmissionId(id),
            image: image(),
        });
        state.apply(PipelineEvent::Started {
            submission: SubmissionId(id),
            token,
            percent: 4,
        });
        state
    }

    #[test]
    fn test_rejection_only_sets_error() {
        let mut state = running(1);
        state.apply(PipelineEvent::Rejected {
            reason: "Unsupported file type".into(),
        });
        assert_eq!(state.error.as_deref(), Some("Unsupported file type"));
        assert!(state.is_running());
        assert_eq!(state.session.as_ref().unwrap().id, SubmissionId(1));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut state = running(1);
        assert_eq!(state.progress_percent(), 4);
        let id = SubmissionId(1);
        assert!(state
            .apply(PipelineEvent::Progressed { submission: id, percent: 40 })
            .is_applied());
        assert!(!state
            .apply(PipelineEvent::Progressed { submission: id, percent: 30 })
            .is_applied());
        assert_eq!(state.progress_percent(), 40);
        state.apply(PipelineEvent::Progressed { submission: id, percent: 250 });
        assert_eq!(state.progress_percent(), 100);
    }

    #[test]
    fn test_terminal_states_reset_progress() {
        for event in [
            PipelineEvent::Succeeded { submission: SubmissionId(1) },
            PipelineEvent::Failed {
                submission: SubmissionId(1),
                reason: "boom".into(),
            },
            PipelineEvent::Cancelled { submission: SubmissionId(1) },
        ] {
            let mut state = running(1);
            state.apply(PipelineEvent::Progressed {
                submission: SubmissionId(1),
                percent: 80,
            });
            assert!(state.apply(event).is_applied());
            assert!(!state.is_running());
            assert_eq!(state.progress_percent(), 0);
            assert_eq!(state.job.as_ref().unwrap().progress_percent, 0);
        }
    }

    #[test]
    fn test_failure_sets_error() {
        let mut state = running(1);
        state.apply(PipelineEvent::Failed {
            submission: SubmissionId(1),
            reason: "Background removal failed: boom".into(),
        });
        assert_eq!(state.status(), JobStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Background removal failed: boom"));
    }

    #[test]
    fn test_superseded_events_are_ignored() {
        let mut state = running(1);
        let old_token = state.session.as_ref().unwrap().token.clone();
        old_token.cancel();
        state.apply(PipelineEvent::Submitted { session: session(2) });

        let stale = SubmissionId(1);
        for event in [
            PipelineEvent::Progressed { submission: stale, percent: 90 },
            PipelineEvent::Succeeded { submission: stale },
            PipelineEvent::Failed {
                submission: stale,
                reason: "late".into(),
            },
            PipelineEvent::Loaded {
                submission: stale,
                image: image(),
            },
            PipelineEvent::ReadFailed {
                submission: stale,
                reason: "late".into(),
            },
        ] {
            assert_eq!(state.apply(event), Transition::Ignored);
        }
        assert_eq!(state.session.as_ref().unwrap().id, SubmissionId(2));
        assert_eq!(state.job.as_ref().unwrap().submission, stale);
        assert_eq!(state.status(), JobStatus::Cancelled);
        assert_eq!(state.progress_percent(), 0);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_superseded_job_is_marked_cancelled_then_replaced() {
        let mut state = running(1);
        state.session.as_ref().unwrap().token.cancel();
        state.apply(PipelineEvent::Submitted { session: session(2) });
        assert_eq!(state.status(), JobStatus::Cancelled);

        // the old job's own cancellation arrives late and changes nothing
        assert_eq!(
            state.apply(PipelineEvent::Cancelled { submission: SubmissionId(1) }),
            Transition::Ignored
        );

        let token = state.session.as_ref().unwrap().token.clone();
        assert!(state
            .apply(PipelineEvent::Started {
                submission: SubmissionId(2),
                token,
                percent: 4,
            })
            .is_applied());
        assert_eq!(state.status(), JobStatus::Running);
        assert_eq!(state.job.as_ref().unwrap().submission, SubmissionId(2));
    }

    #[test]
    fn test_finished_job_is_dropped_on_new_submission() {
        let mut state = running(1);
        state.apply(PipelineEvent::Succeeded { submission: SubmissionId(1) });
        state.apply(PipelineEvent::Submitted { session: session(2) });
        assert!(state.job.is_none());
        assert_eq!(state.status(), JobStatus::Idle);
    }

    #[test]
    fn test_cancelled_token_blocks_completion() {
        let mut state = running(1);
        state.job.as_ref().unwrap().token.cancel();
        assert_eq!(
            state.apply(PipelineEvent::Succeeded { submission: SubmissionId(1) }),
            Transition::Ignored
        );
        assert!(state
            .apply(PipelineEvent::Cancelled { submission: SubmissionId(1) })
            .is_applied());
        assert_eq!(state.status(), JobStatus::Cancelled);
    }

    #[test]
    fn test_read_failure_keeps_session() {
        let mut state = PipelineState::new();
        state.apply(PipelineEvent::Submitted { session: session(1) });
        state.apply(PipelineEvent::ReadFailed {
            submission: SubmissionId(1),
            reason: "Failed to read file: gone".into(),
        });
        assert_eq!(state.session.as_ref().unwrap().file_name, "file1.png");
        assert!(state.job.is_none());
        assert_eq!(state.status(), JobStatus::Idle);
        assert!(state.error.is_some());
    }

    #[test]
    fn test_submission_clears_error() {
        let mut state = PipelineState::new();
        state.apply(PipelineEvent::Rejected { reason: "too big".into() });
        state.apply(PipelineEvent::Submitted { session: session(1) });
        assert!(state.error.is_none());
    }

    #[test]
    fn test_clear_resets_but_keeps_preview_background() {
        let mut state = running(1);
        state.apply(PipelineEvent::PreviewBackgroundToggled);
        state.apply(PipelineEvent::Cleared);
        assert!(state.session.is_none());
        assert!(state.job.is_none());
        assert!(state.error.is_none());
        assert_eq!(state.status(), JobStatus::Idle);
        assert_eq!(state.preview_background, PreviewBackground::Solid);
    }

    #[test]
    fn test_painted_once_per_source() {
        let mut state = PipelineState::new();
        assert_eq!(state.apply(PipelineEvent::Painted(Pane::Original)), Transition::Ignored);

        let mut state = running(1);
        assert!(state.apply(PipelineEvent::Painted(Pane::Original)).is_applied());
        assert_eq!(state.apply(PipelineEvent::Painted(Pane::Original)), Transition::Ignored);
        assert!(state.original_loaded);

        assert_eq!(state.apply(PipelineEvent::Painted(Pane::Processed)), Transition::Ignored);
        state.apply(PipelineEvent::Succeeded { submission: SubmissionId(1) });
        assert!(state.apply(PipelineEvent::Painted(Pane::Processed)).is_applied());
        assert!(state.processed_loaded);

        state.apply(PipelineEvent::Submitted { session: session(2) });
        assert!(!state.original_loaded);
        assert!(!state.processed_loaded);
    }

    #[test]
    fn test_second_start_is_ignored_while_running() {
        let mut state = running(1);
        let token = state.session.as_ref().unwrap().token.clone();
        assert_eq!(
            state.apply(PipelineEvent::Started {
                submission: SubmissionId(1),
                token,
                percent: 4,
            }),
            Transition::Ignored
        );
    }
}
