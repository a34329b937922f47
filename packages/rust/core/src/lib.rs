//! Sync pipeline for StudioSync.
//!
//! This crate ties the extractor and the platform client together:
//! - [`Assembler`]: Transcript → document blocks (direct or via markdown)
//! - [`SyncOrchestrator`]: token → create → assemble → write, as an [`Outcome`]
//! - [`Relay`]: message routing between a control surface and the pipeline
//!
//! [`Outcome`]: studiosync_shared::Outcome

pub mod assembler;
pub mod orchestrator;
pub mod relay;

pub use assembler::{AssembledBlocks, Assembler, markdown_document, sort_by_first_level};
pub use orchestrator::{SyncFailure, SyncOrchestrator};
pub use relay::{Dispatch, Relay, Request, Response};
