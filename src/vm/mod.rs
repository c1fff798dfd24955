//! VM instances and the narrow introspection surface the dispatcher uses.
//!
//! The hook engine never reaches into Lua internals beyond what this module
//! exposes: call-site resolution, named globals, and callable invocation.

pub mod debug_info;
pub mod instance;
pub mod manager;

pub use debug_info::{current_call_site, function_call_site, CallSite};
pub use instance::{ScriptVm, VmId};
pub use manager::{ExecutionScope, VmManager};
