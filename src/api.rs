//! Script-facing API and instrumented native registration.
//!
//! Natives registered through [`register_native`] are wrapped with the
//! pre/post function-call interception points, so every call to them is
//! observable, skippable, and subject to argument masking. The hook
//! management functions themselves (`addDebugHook`, `removeDebugHook`) are
//! registered the same way, which is why those two names require an
//! explicit allow-list to observe.

use std::rc::Rc;

use mlua::{FromLuaMulti, Function, IntoLuaMulti, Lua, MultiValue, Result as LuaResult};

use crate::hook::{DebugHookManager, HookCategory};
use crate::value::ScriptValue;
use crate::vm::ScriptVm;
use crate::Result;

/// Register a host native on the VM, wrapped with function-call
/// instrumentation.
///
/// A pre-hook returning the skip verdict suppresses the native entirely;
/// the call then yields no results. The post-hook runs only when the native
/// returned normally.
pub fn register_native<F, R>(
    hooks: &Rc<DebugHookManager>,
    vm: &ScriptVm,
    name: &'static str,
    f: F,
) -> Result<()>
where
    F: Fn(&Lua, &MultiValue) -> LuaResult<R> + 'static,
    R: IntoLuaMulti,
{
    let hooks = Rc::clone(hooks);
    let func = vm.lua().create_function(move |lua, raw: MultiValue| {
        let args: Vec<ScriptValue> = raw.iter().map(ScriptValue::from_lua_lossy).collect();
        if !hooks.on_pre_function_call(name, true, &args) {
            return Ok(MultiValue::new());
        }
        let out = f(lua, &raw)?.into_lua_multi(lua)?;
        hooks.on_post_function_call(name, &args);
        Ok(out)
    })?;
    vm.set_global(name, func)?;
    Ok(())
}

/// Expose `addDebugHook` and `removeDebugHook` to scripts on this VM.
///
/// `addDebugHook(hookType, callback[, nameList])` registers `callback` for
/// the category named by `hookType` (e.g. `"preFunction"`); an omitted or
/// empty name list means "every name". Both functions return a boolean and
/// never raise on registration conflicts.
pub fn register_debug_api(hooks: &Rc<DebugHookManager>, vm: &ScriptVm) -> Result<()> {
    let owner = vm.id();

    let add_hooks = Rc::clone(hooks);
    register_native(hooks, vm, "addDebugHook", move |lua, raw| {
        let (hook_type, callback, names) =
            <(String, Function, Option<Vec<String>>)>::from_lua_multi(raw.clone(), lua)?;
        let Some(category) = HookCategory::from_name(&hook_type) else {
            return Ok(false);
        };
        Ok(add_hooks.add_hook(category, owner, callback, names.unwrap_or_default()))
    })?;

    let remove_hooks = Rc::clone(hooks);
    register_native(hooks, vm, "removeDebugHook", move |lua, raw| {
        let (hook_type, callback) = <(String, Function)>::from_lua_multi(raw.clone(), lua)?;
        let Some(category) = HookCategory::from_name(&hook_type) else {
            return Ok(false);
        };
        Ok(remove_hooks.remove_hook(category, &callback))
    })?;

    Ok(())
}
