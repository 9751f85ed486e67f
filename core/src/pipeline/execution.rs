// billflow/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps and handlers, and rolls back completed
//! steps when one fails.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against the shared context `ctx_data`.
  ///
  /// On the first handler error, rollback handlers of the steps that already
  /// completed run in reverse order, then that error is returned unchanged.
  /// A `Stop` signal ends the run without any rollback.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            context_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut completed: Vec<&str> = Vec::with_capacity(self.steps.len());

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(Level::INFO, step_name, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
        self.roll_back(&completed, &ctx_data).await;
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name,
        step_index = step_idx,
        optional = step_def.optional
      );
      match self.run_step(step_name, &ctx_data).instrument(step_span).await {
        Ok(PipelineControl::Continue) => completed.push(step_name),
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, step_name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        Err(e) => {
          event!(Level::WARN, step_name, error = %e, "Step failed; rolling back completed steps.");
          self.roll_back(&completed, &ctx_data).await;
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_name: &str, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    for (phase, handlers_by_step) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      let Some(handlers) = handlers_by_step.get(step_name) else {
        continue;
      };
      for (handler_idx, handler_fn) in handlers.iter().enumerate() {
        let handler_span = span!(Level::DEBUG, "step_handler", phase, handler_index = handler_idx);
        if handler_fn(ctx_data.clone()).instrument(handler_span).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  async fn roll_back(&self, completed: &[&str], ctx_data: &ContextData<TData>) {
    for step_name in completed.iter().rev() {
      let Some(handlers) = self.rollback.get(*step_name) else {
        continue;
      };
      for handler_fn in handlers.iter().rev() {
        let rollback_span = span!(Level::INFO, "step_rollback", step_name = *step_name);
        if let Err(e) = handler_fn(ctx_data.clone()).instrument(rollback_span).await {
          event!(Level::ERROR, step_name = *step_name, error = %e, "Rollback handler failed.");
        }
      }
    }
  }
}
