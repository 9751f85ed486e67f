// billflow/src/lib.rs

//! billflow: a small ASYNC step pipeline used to orchestrate request flows.
//!
//! A pipeline is an ordered list of named steps over a shared context:
//!  - Each step has before/on/after handlers, run in that order.
//!  - A step can be optional, or skipped by a condition on the context.
//!  - Any handler may stop the pipeline early.
//!  - Steps may register rollback handlers. When a later handler fails, the
//!    rollback handlers of every step that already completed run in reverse
//!    order before the error is returned.
//!  - A type-keyed registry dispatches a context to the pipeline built for it.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{Handler, RollbackHandler};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;

/*
    Typical use:
    1. Define a context struct `MyCtx` holding the inputs and the slots that steps fill in.
    2. Build a `Pipeline<MyCtx, MyError>` from its step names.
    3. Attach handlers with `.on_step()` (and `.before_step()` / `.after_step()` where useful),
       plus `.on_rollback()` for steps whose effects must be undone when a later step fails.
    4. Register the pipeline in a `FlowRegistry<MyError>`.
    5. Per request: `registry.run(ContextData::new(my_ctx)).await`, then read the results back.
*/
