//! Call-site resolution via Lua debug introspection.

use mlua::{Function, Lua};

/// Source location surfaced in hook payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSite {
    /// Source file name, without directory components. Empty when unknown.
    pub file: String,
    /// Line number, 0 when unknown.
    pub line: u32,
}

/// Resolve the script location that triggered the current native call.
///
/// Level 0 is the native function itself, so the interesting frame is one
/// up. Returns an empty `CallSite` when no script frame is active (dispatch
/// invoked directly from host code).
pub fn current_call_site(lua: &Lua) -> CallSite {
    lua.inspect_stack(1)
        .map(|debug| {
            let source = debug.source();
            let file = source
                .short_src
                .as_deref()
                .map(file_basename)
                .unwrap_or_default();
            // Functions without an active line report -1; fall back to where
            // they were defined.
            let line = match debug.curr_line() {
                -1 => source.line_defined.unwrap_or(0) as u32,
                n => n as u32,
            };
            CallSite { file, line }
        })
        .unwrap_or_default()
}

/// Resolve where a script function was defined.
///
/// Used for the event-handler payloads: the handler's registration site is
/// independent of the stack that triggered the event.
pub fn function_call_site(function: &Function) -> CallSite {
    let info = function.info();
    CallSite {
        file: info
            .short_src
            .as_deref()
            .map(file_basename)
            .unwrap_or_default(),
        line: info.line_defined.unwrap_or(0) as u32,
    }
}

fn file_basename(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}
