//! Request orchestration: one upload in, one [`ConversionResult`] out.
//!
//! [`ConversionService::convert`] sequences the pipeline stages for a single
//! request and folds every failure into the returned result; nothing
//! propagates past it and nothing is retried.
//!
//! ```text
//! validate ──▶ intake.store ──▶ transcode ──▶ publish
//!    │              │               │            │
//!    ▼              └───────────────┴────────────┴──▶ release intake ──▶ result
//! Rejected
//! ```
//!
//! The intake file's removal is armed inside `store` before the file exists,
//! and released explicitly once processing finishes. Any early exit in
//! between, including cancellation of the request future, still removes it
//! through the guard's `Drop`.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::{SourceType, TargetFormat};
use crate::pipeline::intake::{IntakeArtifact, IntakeStore};
use crate::pipeline::publish::ArtifactPublisher;
use crate::pipeline::transcode;
use crate::pipeline::validate::{self, Accepted};
use crate::progress::{NoopObserver, RequestStage, SharedObserver};
use crate::request::{ConversionRequest, ConversionResult, OutputArtifact, UploadedFile};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// The request orchestrator.
///
/// Cheap to clone; clones share the config and observer. Holds no
/// per-request state, so any number of requests may run concurrently.
#[derive(Clone)]
pub struct ConversionService {
    config: Arc<ConversionConfig>,
    intake: IntakeStore,
    publisher: ArtifactPublisher,
    observer: SharedObserver,
}

impl std::fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionService")
            .field("config", &self.config)
            .field("intake", &self.intake)
            .field("publisher", &self.publisher)
            .field("observer", &"<dyn ConversionObserver>")
            .finish()
    }
}

impl ConversionService {
    /// Create the service, making sure both storage directories exist.
    pub async fn new(config: ConversionConfig) -> Result<Self, ConvertError> {
        let intake = IntakeStore::open(&config.intake_dir).await?;
        let publisher = ArtifactPublisher::open(&config).await?;
        info!(
            "Conversion service ready: intake={}, output={}, max upload {} bytes",
            config.intake_dir.display(),
            config.output_dir.display(),
            config.max_upload_bytes
        );
        Ok(Self {
            config: Arc::new(config),
            intake,
            publisher,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_publisher(mut self, publisher: ArtifactPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Run one request to completion.
    ///
    /// Always returns exactly one result, and always after the intake file
    /// (if one was written) has been released.
    pub async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        let span = info_span!("conversion", request_id = %request.id);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: ConversionRequest) -> ConversionResult {
        let id = request.id;
        let start = Instant::now();
        self.observer.on_stage(id, RequestStage::Received);

        let result = self.execute(request).await;
        self.observer.on_stage(id, RequestStage::Done);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(artifact) => info!(
                url = %artifact.url,
                size_bytes = artifact.size_bytes,
                elapsed_ms,
                "Conversion complete"
            ),
            Err(e) if e.is_client_error() => {
                warn!(code = e.kind().code(), error = %e, "Upload rejected")
            }
            Err(e) => error!(code = e.kind().code(), error = %e, elapsed_ms, "Conversion failed"),
        }

        self.observer.on_complete(id, result.as_ref());
        result
    }

    async fn execute(&self, request: ConversionRequest) -> ConversionResult {
        let id = request.id;

        let accepted = match validate::validate(&request, &self.config) {
            Ok(a) => a,
            Err(e) => {
                self.observer.on_stage(id, RequestStage::Rejected);
                return Err(e);
            }
        };
        if let Some(name) = request.file.as_ref().and_then(|f| f.file_name.as_deref()) {
            debug!("Client file name: {}", name);
        }

        let data = request.file.map(|f| f.data).unwrap_or_default();
        let intake = match self.intake.store(data).await {
            Ok(i) => i,
            Err(e) => {
                self.observer.on_stage(id, RequestStage::Failed);
                return Err(e);
            }
        };
        self.observer.on_stage(id, RequestStage::Stored);

        let outcome = self.process(id, &intake, accepted).await;

        let cleanup = intake.release();
        debug!("Intake cleanup: {:?}", cleanup);

        outcome
    }

    async fn process(
        &self,
        id: Uuid,
        intake: &IntakeArtifact,
        accepted: Accepted,
    ) -> ConversionResult {
        let transcoded = transcode::transcode(intake, accepted, &self.config)
            .await
            .inspect_err(|_| self.observer.on_stage(id, RequestStage::Failed))?;
        self.observer.on_stage(id, RequestStage::Converted);

        let artifact = self
            .publisher
            .publish(transcoded.bytes, transcoded.format)
            .await
            .inspect_err(|_| self.observer.on_stage(id, RequestStage::Failed))?;
        self.observer.on_stage(id, RequestStage::Published);

        Ok(artifact)
    }
}

/// Convert a local image file.
///
/// The source type is declared from the file extension, falling back to
/// sniffing for unknown extensions. The input file itself is never modified;
/// its bytes pass through the intake store like any upload.
pub async fn convert_file(
    service: &ConversionService,
    path: impl AsRef<Path>,
    target: TargetFormat,
) -> Result<OutputArtifact, ConvertError> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::MissingFile
        } else {
            ConvertError::IntakeFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let mut file = UploadedFile::new(data);
    if let Some(source) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(SourceType::from_extension)
    {
        file = file.with_content_type(source.mime_type());
    }
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        file = file.with_file_name(name);
    }

    service
        .convert(ConversionRequest::for_format(file, target))
        .await
}
