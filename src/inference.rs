//! Background removal capability abstraction
//!
//! The segmentation model is an external collaborator. The pipeline only
//! sees it through [`RemovalBackend`]: image in, blob out, progress ticks in
//! between, and a cancellation token it may or may not honour.

use crate::{
    config::RemovalConfig,
    error::Result,
    services::progress::ProgressCallback,
    types::{Blob, LoadedImage},
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for background removal backends
#[async_trait]
pub trait RemovalBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Remove the background from `image`.
    ///
    /// Implementations should check `cancel` at convenient points and return
    /// [`StudioError::Cancelled`](crate::StudioError::Cancelled) when it fires.
    /// Ignoring it is allowed; the caller discards late results.
    ///
    /// # Errors
    /// - `Cancelled` when the token fired and the backend stopped early
    /// - `ProcessingFailure` for decode, inference or encode failures
    async fn remove_background(
        &self,
        image: &LoadedImage,
        config: &RemovalConfig,
        progress: &dyn ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<Blob>;
}
