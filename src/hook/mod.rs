//! Hook registration, filtering, masking, and dispatch.
//!
//! The host intercepts calls and events at six points (pre/post of native
//! function calls, event dispatches, and scripted event handlers) and hands
//! each one to [`DebugHookManager`], which runs the registered observers and
//! reports whether any of them vetoed the underlying call.

pub mod context;
pub mod dispatch;
pub mod filter;
pub mod masking;
pub mod registry;

pub use dispatch::{DebugHookManager, EventHandlerRef};
pub use masking::MaskTable;
pub use registry::{HookCategory, HookEntry, HookRegistry};
