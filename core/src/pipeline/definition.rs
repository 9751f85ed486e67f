// billflow/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural operations.

use crate::core::handler::{Handler, RollbackHandler};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// An ordered set of named steps over a root data type `TData`.
///
/// `Err` is what handlers return and what `run` fails with. It must be
/// constructible from `FlowError` so configuration problems found at run time
/// (e.g. a required step without handlers) surface through the same type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,

  pub(crate) rollback: HashMap<String, Vec<RollbackHandler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(name, optional, skip_if)` triples, in execution order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      rollback: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn ensure_step_not_exists(&self, step_name: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step_name) {
      return Err(FlowError::DuplicateStep {
        step_name: step_name.to_string(),
      });
    }
    Ok(())
  }

  pub fn insert_step_after<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name)?;
    self.steps.insert(idx + 1, StepDef { name, optional, skip_if });
    Ok(())
  }

  /// Removes a step and every handler attached to it. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
      self.rollback.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }
}
