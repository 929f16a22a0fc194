//! Core FunRaise client library (refresh coordination, debounce, config).

pub mod config;
pub mod debounce;
pub mod logging;
pub mod refresh;
pub mod search;

pub use debounce::{Debounced, debounce};
pub use refresh::{
    BindingState, CallbackFailure, FocusPolicy, MaybeAsync, RefreshBinding, RefreshRegistry,
    SweepReport, callback,
};
pub use search::SearchInput;
