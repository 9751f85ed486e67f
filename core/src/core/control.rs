// billflow/src/core/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by a handler to continue or halt the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt immediately. Remaining handlers and steps do not run and no rollback happens.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step that was not skipped ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
