// billflow/src/core/handler.rs

//! Boxed handler types stored by a pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler: takes a clone of the run's `ContextData<TData>` and resolves to
/// `Result<PipelineControl, Err>`.
///
/// Handlers read what they need under a short lock, drop the guard, do their I/O,
/// then write results back under a second short lock.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// A compensation handler, run when a later step of the same run fails.
/// It cannot stop the pipeline; its error is logged and otherwise ignored.
pub type RollbackHandler<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>> + Send + Sync>;
