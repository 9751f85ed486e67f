// billflow/src/registry.rs

//! `FlowRegistry<E>`: pipelines keyed by the type of the context they run on.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedPipeline<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must hold a `ContextData<TData>` for the wrapped pipeline's `TData`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedPipeline<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Pipeline<TData, HandlerErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedPipeline<AppErr> for TypedPipeline<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>().to_string();
        event!(Level::ERROR, %expected_type, "Context object type mismatch.");
        return Err(AppErr::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.pipeline.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Holds one pipeline per context type. `AppErr` is what `run` returns.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipelines: Mutex<HashMap<TypeId, Arc<dyn ErasedPipeline<AppErr>>>>,
  _phantom_app_err: PhantomData<AppErr>,
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: Mutex::new(HashMap::new()),
      _phantom_app_err: PhantomData,
    }
  }

  /// Registers `pipeline` for contexts of type `TData`, replacing any previous one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(Level::DEBUG, context_type = %std::any::type_name::<TData>(), steps = ?pipeline.step_names(), "Registering pipeline.");
    let erased: Arc<dyn ErasedPipeline<AppErr>> = Arc::new(TypedPipeline { pipeline });
    self.pipelines.lock().insert(TypeId::of::<TData>(), erased);
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.pipelines.lock().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self
      .pipelines
      .lock()
      .get(&TypeId::of::<TData>())
      .cloned()
      .ok_or_else(|| {
        let type_name = std::any::type_name::<TData>().to_string();
        event!(Level::ERROR, %type_name, "No pipeline registered for context type.");
        AppErr::from(FlowError::NoPipelineRegistered { type_name })
      })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}
