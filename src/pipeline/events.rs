// ABOUTME: Progress events emitted while a pipeline is executed.
// ABOUTME: Consumers receive them over an unbounded channel.

use crate::types::ImageId;

/// 1-based position of a run-command step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepIndex {
    pub number: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    PullingImage(String),
    StepStarted { step: StepIndex, command: String },
    Output { step: StepIndex, line: String },
    StepFinished { step: StepIndex, exit_code: i64 },
    /// A tolerated step failed; the pipeline continues.
    FailureMasked {
        step: StepIndex,
        exit_code: i64,
        fallback: String,
    },
    LayerCommitted { step: StepIndex, image: ImageId },
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<PipelineEvent>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
