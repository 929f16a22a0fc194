//! Pull-to-refresh coordination.
//!
//! - `registry`: keyed callback registry, sweeps and the generation counter
//! - `binding`: per-consumer adapter that keeps one registration current
//! - `callback`: callback, outcome and sweep report types
//! - `focus`: what a navigation focus event does

pub mod binding;
pub mod callback;
pub mod focus;
pub mod registry;

pub use binding::{BindingState, RefreshBinding, RefreshScope};
pub use callback::{
    CallbackFailure, FailureKind, MaybeAsync, RefreshCallback, RefreshFuture, SweepReport,
    callback,
};
pub use focus::FocusPolicy;
pub use registry::RefreshRegistry;
