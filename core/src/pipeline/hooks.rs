// billflow/src/pipeline/hooks.rs

//! Handler registration. Every method checks that the step exists and returns
//! `FlowError::StepNotFound` otherwise.

use tracing::{event, Level};

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::{Handler, RollbackHandler};
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;

fn boxed_handler<TData, Err, F, UserErr>(
  handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
  UserErr: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx_data| {
    let user_fut = handler_fn(ctx_data);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn push_handler(
    &mut self,
    phase: fn(&mut Self) -> &mut HashMap<String, Vec<Handler<TData, Err>>>,
    step_name: &str,
    handler: Handler<TData, Err>,
  ) -> FlowResult<()> {
    self.position_of(step_name)?;
    phase(self).entry(step_name.to_string()).or_default().push(handler);
    Ok(())
  }

  /// Registers a handler that runs before the step's `on` handlers.
  ///
  /// The handler's own error type only needs to convert into the pipeline's `Err`.
  pub fn before_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(|p| &mut p.before, step_name, boxed_handler(handler_fn))
  }

  /// Registers the main handler of a step.
  pub fn on_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(|p| &mut p.on, step_name, boxed_handler(handler_fn))
  }

  pub fn after_step<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_handler(|p| &mut p.after, step_name, boxed_handler(handler_fn))
  }

  /// Registers a compensation for a step. It runs only if this step completed
  /// and a later step of the same run failed.
  pub fn on_rollback<F, UserErr>(
    &mut self,
    step_name: &str,
    rollback_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<(), UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.position_of(step_name)?;
    let handler: RollbackHandler<TData, Err> = Box::new(move |ctx_data| {
      let user_fut = rollback_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    self.rollback.entry(step_name.to_string()).or_default().push(handler);
    event!(Level::DEBUG, %step_name, "Rollback handler registered.");
    Ok(())
  }
}
