// tests/rollback_tests.rs
mod common;

use billflow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use common::*;
use serial_test::serial;

fn three_step_pipeline() -> Result<Pipeline<TestContext, TestError>, FlowError> {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("reserve", false, None),
    ("charge", false, None),
    ("persist", false, None),
  ]);
  pipeline.on_step("reserve", create_simple_handler("reserve", "R"))?;
  pipeline.on_rollback("reserve", create_rollback("reserve"))?;
  pipeline.on_step("charge", create_simple_handler("charge", "C"))?;
  pipeline.on_rollback("charge", create_rollback("charge"))?;
  pipeline.on_rollback("persist", create_rollback("persist"))?;
  Ok(pipeline)
}

#[tokio::test]
#[serial]
async fn test_failure_rolls_back_completed_steps_in_reverse() -> Result<(), FlowError> {
  setup_tracing();
  let mut pipeline = three_step_pipeline()?;
  pipeline.on_step("persist", create_failing_handler("persist", "disk full"))?;

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("disk full".to_string())));
  // The failing step itself is not rolled back.
  assert_eq!(ctx.read().rolled_back, vec!["charge", "reserve"]);
  Ok(())
}

#[tokio::test]
#[serial]
async fn test_successful_run_does_not_roll_back() -> Result<(), FlowError> {
  setup_tracing();
  let mut pipeline = three_step_pipeline()?;
  pipeline.on_step("persist", create_simple_handler("persist", "P"))?;

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert!(ctx.read().rolled_back.is_empty());
  assert_eq!(ctx.read().message, "RCP");
  Ok(())
}

#[tokio::test]
#[serial]
async fn test_stop_does_not_roll_back() -> Result<(), FlowError> {
  setup_tracing();
  let mut pipeline = three_step_pipeline()?;
  pipeline.on_step("persist", create_simple_handler("persist", "P"))?;

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("charge".to_string()),
    ..Default::default()
  });
  assert_eq!(pipeline.run(ctx.clone()).await, Ok(PipelineResult::Stopped));
  assert!(ctx.read().rolled_back.is_empty());
  Ok(())
}

#[tokio::test]
#[serial]
async fn test_failing_rollback_keeps_original_error() -> Result<(), FlowError> {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("first", false, None), ("second", false, None)]);
  pipeline.on_step("first", create_simple_handler("first", "1"))?;
  pipeline.on_rollback("first", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err::<(), TestError>(TestError::Rollback("cannot undo".to_string())) })
  })?;
  pipeline.on_rollback("first", create_rollback("first"))?;
  pipeline.on_step("second", create_failing_handler("second", "boom"))?;

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("boom".to_string())));
  // Both rollbacks of "first" were attempted, latest registration first.
  assert_eq!(ctx.read().rolled_back, vec!["first"]);
  Ok(())
}

#[tokio::test]
#[serial]
async fn test_skipped_step_is_not_rolled_back() -> Result<(), FlowError> {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("maybe", false, Some(std::sync::Arc::new(|_ctx: ContextData<TestContext>| true))),
    ("always", false, None),
    ("fail", false, None),
  ]);
  pipeline.on_step("maybe", create_simple_handler("maybe", "M"))?;
  pipeline.on_rollback("maybe", create_rollback("maybe"))?;
  pipeline.on_step("always", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter += 10;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  })?;
  pipeline.on_rollback("always", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter -= 10;
      guard.rolled_back.push("always".to_string());
      Ok::<(), TestError>(())
    })
  })?;
  pipeline.on_step("fail", create_failing_handler("fail", "nope"))?;

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  let guard = ctx.read();
  assert_eq!(guard.counter, 0);
  assert_eq!(guard.rolled_back, vec!["always"]);
  Ok(())
}
