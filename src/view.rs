//! View state projection
//!
//! [`ViewState`] is what a presentation layer renders. It is derived from
//! [`PipelineState`] and the current result artifact and never stored back.

use crate::{
    config::OutputFormat,
    services::format::{download_file_name, format_size},
    state::{PipelineState, PreviewBackground},
    types::{JobStatus, ResultArtifact},
};
use serde::Serialize;

/// One preview pane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImagePane {
    /// `data:` URI or object handle URL; absent when there is nothing to show
    pub src: Option<String>,
    /// Set after the first successful paint of `src`, drives the fade-in
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub status: JobStatus,
    pub original: ImagePane,
    pub processed: ImagePane,
    pub show_progress: bool,
    pub progress_percent: u8,
    pub download_enabled: bool,
    pub download_name: Option<String>,
    pub error: Option<String>,
    pub file_name: Option<String>,
    /// Human-readable size, e.g. `2.0 MB`
    pub file_size: Option<String>,
    pub preview_background: PreviewBackground,
}

impl ViewState {
    /// Project the pipeline state. An artifact that does not belong to the
    /// current session is treated as absent.
    #[must_use]
    pub fn project(state: &PipelineState, artifact: Option<ResultArtifact>, format: OutputFormat) -> Self {
        let session = state.session.as_ref();
        let artifact = artifact.filter(|a| session.is_some_and(|s| s.id == a.session));
        let running = state.is_running();

        let original = ImagePane {
            src: session
                .and_then(|s| s.source_image.as_ref())
                .map(|image| image.data_uri().to_string()),
            loaded: state.original_loaded,
        };
        let processed = ImagePane {
            src: artifact.map(|a| a.handle.to_string()),
            loaded: artifact.is_some() && state.processed_loaded,
        };

        Self {
            status: state.status(),
            original,
            processed,
            show_progress: running,
            progress_percent: if running { state.progress_percent() } else { 0 },
            download_enabled: artifact.is_some(),
            download_name: session
                .filter(|_| artifact.is_some())
                .map(|s| download_file_name(&s.file_name, format)),
            error: state.error.clone(),
            file_name: session.map(|s| s.file_name.clone()),
            file_size: session.map(|s| format_size(s.file_size_bytes)),
            preview_background: state.preview_background,
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::project(&PipelineState::default(), None, OutputFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Pane, PipelineEvent};
    use crate::types::{AcceptedFile, ImageKind, LoadedImage, ObjectHandle, SubmissionId, UploadSession};
    use tokio_util::sync::CancellationToken;

    fn submitted(name: &str) -> PipelineState {
        let file = AcceptedFile {
            name: name.to_string(),
            size_bytes: 2 * 1024 * 1024,
            kind: ImageKind::Jpeg,
        };
        let session = UploadSession::new(SubmissionId(1), &file, CancellationToken::new());
        let token = session.token.clone();
        let mut state = PipelineState::new();
        state.apply(PipelineEvent::Submitted { session });
        state.apply(PipelineEvent::Loaded {
            submission: SubmissionId(1),
            image: LoadedImage::new(ImageKind::Jpeg, vec![0xff, 0xd8]),
        });
        state.apply(PipelineEvent::Started {
            submission: SubmissionId(1),
            token,
            percent: 4,
        });
        state
    }

    #[test]
    fn test_idle_view() {
        let view = ViewState::default();
        assert_eq!(view.status, JobStatus::Idle);
        assert!(!view.show_progress);
        assert_eq!(view.progress_percent, 0);
        assert!(!view.download_enabled);
        assert!(view.original.src.is_none());
        assert!(view.processed.src.is_none());
        assert!(view.error.is_none());
    }

    #[test]
    fn test_running_view_shows_progress() {
        let state = submitted("photo.jpg");
        let view = ViewState::project(&state, None, OutputFormat::Png);
        assert!(view.show_progress);
        assert_eq!(view.progress_percent, 4);
        assert_eq!(view.file_name.as_deref(), Some("photo.jpg"));
        assert_eq!(view.file_size.as_deref(), Some("2.0 MB"));
        assert_eq!(view.original.src.as_deref(), Some("data:image/jpeg;base64,/9g="));
        assert!(!view.download_enabled);
        assert!(view.download_name.is_none());
    }

    #[test]
    fn test_succeeded_view_enables_download() {
        let mut state = submitted("photo.jpg");
        state.apply(PipelineEvent::Succeeded { submission: SubmissionId(1) });
        state.apply(PipelineEvent::Painted(Pane::Processed));
        let artifact = ResultArtifact {
            handle: ObjectHandle(9),
            session: SubmissionId(1),
        };

        let view = ViewState::project(&state, Some(artifact), OutputFormat::Png);
        assert!(!view.show_progress);
        assert_eq!(view.progress_percent, 0);
        assert!(view.download_enabled);
        assert_eq!(view.download_name.as_deref(), Some("photo.png"));
        assert_eq!(view.processed.src.as_deref(), Some("blob:bgremove-studio/9"));
        assert!(view.processed.loaded);
    }

    #[test]
    fn test_foreign_artifact_is_hidden() {
        let state = submitted("photo.jpg");
        let artifact = ResultArtifact {
            handle: ObjectHandle(3),
            session: SubmissionId(7),
        };
        let view = ViewState::project(&state, Some(artifact), OutputFormat::Png);
        assert!(!view.download_enabled);
        assert!(view.processed.src.is_none());
    }

    #[test]
    fn test_view_serializes_to_json() {
        let json = serde_json::to_value(ViewState::default()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["preview_background"], "checkerboard");
        assert_eq!(json["download_enabled"], false);
    }
}
