//! Map views over the document store.
//!
//! - [`script`]: the sandboxed interpreter map functions run in
//! - [`ViewEngine`]: applies delivered changes to the stored view rows
//! - [`ViewReader`]: serves the rows of one view
//! - [`ChangeConsumer`]: pulls changes off the queue, with redelivery and
//!   startup catch-up

pub mod design;
pub mod engine;
pub mod error;
pub mod read;
pub mod script;
pub mod worker;

pub use design::{CompiledView, compile_design};
pub use engine::{EngineConfig, ViewEngine};
pub use error::{Result, ViewError};
pub use read::{ViewQuery, ViewReader, ViewResult};
pub use script::{Emitted, MapFunction, ScriptBudget, ScriptError};
pub use worker::{ChangeConsumer, ConsumerConfig};
