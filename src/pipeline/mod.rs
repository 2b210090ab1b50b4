//! Pipeline stages for image conversion.
//!
//! Each submodule implements exactly one step, and each is independently
//! testable. [`crate::convert::ConversionService`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ intake ──▶ transcode ──▶ publish
//! (metadata)   (disk)     (CPU pool)    (disk)
//!                 │
//!                 └── cleanup guard, released on every exit path
//! ```
//!
//! 1. [`validate`]  presence, source type, size, target format; no I/O
//! 2. [`intake`]    write the raw upload under a UUID name
//! 3. [`transcode`] decode + encode in `spawn_blocking`, with a timeout
//! 4. [`publish`]   atomic write to `<token>.<ext>` in the output dir
//! 5. [`cleanup`]   remove the intake file exactly once

pub mod cleanup;
pub mod intake;
pub mod publish;
pub mod transcode;
pub mod validate;
