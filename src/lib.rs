//! A virtual-DOM Model-View-Update runtime for Rust.
//!
//! An application holds a single model, renders it to a tree of virtual
//! nodes, and reacts to messages by producing a new model plus commands.
//! The runtime diffs each new tree against the previous one, including
//! identity-keyed child lists, and patches a [`RenderTarget`] with the
//! minimal set of mutations. Commands are [`Task`]s stepped by a cooperative
//! single-threaded [`Scheduler`]; their results come back as messages.
//!
//! ## Example
//!
//! ```rust
//! use oxide_vdom::{
//!     node, on, text, Application, Command, Decoder, Runtime, TestTarget, Value, VNode,
//! };
//!
//! #[derive(Clone)]
//! enum Msg { AccumulateClicked }
//!
//! #[derive(Clone)]
//! struct Model { count: i32 }
//!
//! struct Counter;
//!
//! impl Application<Msg, Model> for Counter {
//!     fn init(&self) -> (Model, Command<Msg>) {
//!         (Model { count: 0 }, Command::none())
//!     }
//!
//!     fn update(&self, msg: Msg, model: &Model) -> (Model, Command<Msg>) {
//!         match msg {
//!             Msg::AccumulateClicked => {
//!                 let new_model = Model {
//!                     count: model.count + 1,
//!                     ..model.clone()
//!                 };
//!                 (new_model, Command::none())
//!             }
//!         }
//!     }
//!
//!     fn view(&self, model: &Model) -> VNode<Msg> {
//!         node(
//!             "button",
//!             vec![on("click", Decoder::succeed(Msg::AccumulateClicked))],
//!             vec![text(model.count.to_string())],
//!         )
//!     }
//! }
//!
//! // Any `RenderTarget` works; `TestTarget` is an in-memory document.
//! let target = TestTarget::new();
//! let mut runtime = Runtime::new(Counter, target.clone());
//! runtime.start().unwrap();
//!
//! target.fire(&[], "click", &Value::Null);
//! runtime.process_queued().unwrap();
//!
//! assert_eq!(runtime.model().map(|m| m.count), Some(1));
//! ```

// Module declarations
mod apply;
mod command;
mod config;
mod diff;
mod emitter;
mod error;
mod keyed;
mod logic;
mod patch;
mod runtime;
mod scheduler;
mod target;
mod task;
mod value;
mod vnode;

// Public re-exports
pub use apply::Applier;
pub use command::Command;
pub use config::{SchedulerConfig, DEFAULT_STEP_BUDGET};
pub use diff::diff;
pub use emitter::Emitter;
pub use error::{DecodeError, RuntimeError};
pub use logic::Application;
pub use patch::{Edit, Insert, Move, Patch, PatchOp, PatchStats, Reorder};
pub use runtime::Runtime;
pub use scheduler::{ProcessId, Scheduler, TaskHandle, TaskState};
pub use target::{Listener, ListenerId, RenderTarget};
pub use task::{CancelFn, Resume, Task};
pub use value::Value;
pub use vnode::{
    attribute, keyed_node, node, on, property, style, text, Attribute, Decoder, MapFn, VNode,
};

// Test utilities (only available with 'testing' feature or during tests)
#[cfg(any(test, feature = "testing"))]
pub use runtime::{TestDriver, TestRuntime};
#[cfg(any(test, feature = "testing"))]
pub use target::{NodeId, Snapshot, TargetCounters, TestTarget};
