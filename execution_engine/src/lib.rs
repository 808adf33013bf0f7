//! Seam between the consensus transition and the execution layer.
//!
//! Payload execution happens outside this codebase. The transition only
//! needs a verdict on each payload, and optimistic sync needs the option
//! of deferring that verdict.

use anyhow::Result;
use types::{bellatrix::containers::ExecutionPayload, preset::Preset};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PayloadStatus {
    Valid,
    Invalid,
    /// The execution layer has not validated the payload yet.
    /// The caller decides whether to proceed optimistically.
    Optimistic,
}

pub trait ExecutionEngine<P: Preset> {
    fn notify_new_payload(&self, payload: &ExecutionPayload<P>) -> Result<PayloadStatus>;
}

impl<P: Preset, E: ExecutionEngine<P>> ExecutionEngine<P> for &E {
    fn notify_new_payload(&self, payload: &ExecutionPayload<P>) -> Result<PayloadStatus> {
        (*self).notify_new_payload(payload)
    }
}

/// Accepts every payload without running it. Used where no execution layer
/// is attached, like replaying finalized blocks.
pub struct NullExecutionEngine;

impl<P: Preset> ExecutionEngine<P> for NullExecutionEngine {
    fn notify_new_payload(&self, _payload: &ExecutionPayload<P>) -> Result<PayloadStatus> {
        Ok(PayloadStatus::Optimistic)
    }
}
