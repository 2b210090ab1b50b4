//! Observer trait for per-request pipeline events.
//!
//! Inject an [`Arc<dyn ConversionObserver>`] via
//! [`crate::convert::ConversionService::with_observer`] to be told when a
//! request changes stage. The CLI uses it to drive a spinner; a server could
//! forward events to a WebSocket or metrics sink.
//!
//! The core keeps no percentage state. Upload and download progress are
//! properties of the HTTP body stream and belong to the transport.
//!
//! # Example
//!
//! ```rust
//! use edgequake_imgconv::{ConversionObserver, RequestStage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use uuid::Uuid;
//!
//! #[derive(Default)]
//! struct CountPublished(AtomicUsize);
//!
//! impl ConversionObserver for CountPublished {
//!     fn on_stage(&self, _id: Uuid, stage: RequestStage) {
//!         if stage == RequestStage::Published {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::error::ConvertError;
use crate::request::OutputArtifact;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Where a request is in its lifecycle.
///
/// ```text
/// Received ─▶ Rejected ─────────────────────────────────┐
///     │                                                 ▼
///     └─▶ Stored ─▶ Converted ─▶ Published ──────────▶ Done
///            │          │                               ▲
///            └──────────┴─▶ Failed ─────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStage {
    Received,
    Rejected,
    Stored,
    Converted,
    Published,
    Failed,
    /// Cleanup has run; the request is over.
    Done,
}

impl RequestStage {
    pub fn is_terminal(self) -> bool {
        self == RequestStage::Done
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStage::Received => "received",
            RequestStage::Rejected => "rejected",
            RequestStage::Stored => "stored",
            RequestStage::Converted => "converted",
            RequestStage::Published => "published",
            RequestStage::Failed => "failed",
            RequestStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Called by the orchestrator as a request moves through the pipeline.
///
/// Requests run concurrently, so implementations must be `Send + Sync` and
/// protect shared state themselves. All methods default to no-ops.
pub trait ConversionObserver: Send + Sync {
    /// Called on every stage transition, in order.
    fn on_stage(&self, request_id: Uuid, stage: RequestStage) {
        let _ = (request_id, stage);
    }

    /// Called once per request, after cleanup, with the final outcome.
    fn on_complete(&self, request_id: Uuid, outcome: Result<&OutputArtifact, &ConvertError>) {
        let _ = (request_id, outcome);
    }
}

/// Default observer.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

pub type SharedObserver = Arc<dyn ConversionObserver>;
