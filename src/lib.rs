//! # edgequake-imgconv
//!
//! Convert uploaded images between formats and publish the result under a
//! retrievable URL.
//!
//! ## Why this crate?
//!
//! A conversion endpoint looks trivial until it runs under load: uploads
//! must be checked before they hit disk, decode work must stay off the async
//! executor, two requests in the same millisecond must never overwrite each
//! other's output, and the raw upload must be removed on every exit path.
//! This crate packages those guarantees behind one call,
//! [`ConversionService::convert`], and an optional axum router.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Validate   presence, source type, size, target format (no I/O)
//!  ├─ 2. Intake     write raw bytes to <intake_dir>/<uuid>.upload
//!  ├─ 3. Transcode  decode + encode in spawn_blocking, with a timeout
//!  ├─ 4. Publish    atomic write to <output_dir>/<token>.<ext>
//!  └─ 5. Cleanup    remove the intake file, exactly once
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_imgconv::{ConversionConfig, ConversionRequest, ConversionService, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ConversionService::new(ConversionConfig::default()).await?;
//!
//!     let bytes = std::fs::read("photo.png")?;
//!     let file = UploadedFile::new(bytes).with_content_type("image/png");
//!     let request = ConversionRequest::new(Some(file), Some("jpeg".into()));
//!
//!     let artifact = service.convert(request).await?;
//!     println!("{}", artifact.url); // /converted/<token>.jpeg
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router + static serving of converted files |
//! | `cli`    | on      | Enables the `imgconv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when embedding only the pipeline:
//! ```toml
//! edgequake-imgconv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod progress;
pub mod request;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use convert::{convert_file, ConversionService};
pub use error::{ConvertError, ErrorKind, GENERIC_FAILURE_MESSAGE};
pub use format::{SourceType, TargetFormat};
pub use progress::{ConversionObserver, NoopObserver, RequestStage, SharedObserver};
pub use request::{ConversionRequest, ConversionResponse, ConversionResult, OutputArtifact, UploadedFile};
