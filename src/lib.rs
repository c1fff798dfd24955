//! scripthook - Debug hook instrumentation for embedded Lua scripting hosts.
//!
//! Sits between a host application and its embedded Lua VMs: registered
//! observer callbacks can inspect, mask, and veto native function calls and
//! event dispatches at six interception points, without the scripting
//! engine itself knowing about any of it.

pub mod api;
pub mod config;
pub mod error;
pub mod hook;
pub mod host;
pub mod logging;
pub mod value;
pub mod vm;

pub use config::Config;
pub use error::{HookError, Result};
pub use hook::{DebugHookManager, EventHandlerRef, HookCategory, MaskTable};
pub use host::ScriptHost;
pub use value::{ElementId, ResourceId, ScriptValue};
pub use vm::{CallSite, ScriptVm, VmId, VmManager};
