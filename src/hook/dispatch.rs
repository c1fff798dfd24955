//! Hook dispatch state machine.
//!
//! `DebugHookManager` owns the registry and walks it for each interception
//! point: empty-list fast exit, cheap name pre-check, payload construction,
//! then one callback invocation per matching entry with the owning VM's
//! context globals saved and restored around it. A scoped guard collapses
//! re-entrant dispatch (a hook whose side effects reach another interception
//! point) into an immediate "allow".

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use mlua::{Function, Lua, MultiValue, Result as LuaResult, Table, Value, Variadic};
use tracing::{debug, trace, warn};

use super::context;
use super::filter;
use super::masking::MaskTable;
use super::registry::{HookCategory, HookEntry, HookRegistry};
use crate::value::{ElementId, ResourceId, ScriptValue};
use crate::vm::{current_call_site, function_call_site, CallSite, VmId, VmManager};

/// The interpreter globals conventionally used to expose call context to
/// script code. All six are saved and restored around every hook invocation
/// regardless of category, so a hook's side effects cannot leak into the
/// next observer or back into the interrupted call.
pub(crate) const CONTEXT_GLOBALS: [&str; 6] = [
    "source",
    "this",
    "sourceResource",
    "sourceResourceRoot",
    "eventName",
    "client",
];

/// Saved values of the context globals for one VM.
pub(crate) struct GlobalsSnapshot {
    globals: Table,
    saved: Vec<(&'static str, Value)>,
}

impl GlobalsSnapshot {
    pub(crate) fn capture(lua: &Lua) -> LuaResult<Self> {
        let globals = lua.globals();
        let mut saved = Vec::with_capacity(CONTEXT_GLOBALS.len());
        for name in CONTEXT_GLOBALS {
            // Unset globals read back as nil and restore as nil.
            saved.push((name, globals.get::<Value>(name)?));
        }
        Ok(Self { globals, saved })
    }

    pub(crate) fn restore(self) -> LuaResult<()> {
        let Self { globals, saved } = self;
        for (name, value) in saved {
            globals.set(name, value)?;
        }
        Ok(())
    }
}

/// Scoped re-entrancy guard. Held for the duration of one dispatch loop;
/// released on every exit path via `Drop`.
struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn try_acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.get() {
            return None;
        }
        flag.set(true);
        Some(Self { flag })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// A scripted event handler about to be invoked, as seen by the
/// event-handler interception points.
#[derive(Clone)]
pub struct EventHandlerRef {
    /// VM the handler was registered from.
    pub vm: VmId,
    pub function: Function,
}

/// The hook dispatch engine.
pub struct DebugHookManager {
    vms: Rc<VmManager>,
    registry: HookRegistry,
    masking: MaskTable,
    dispatching: Cell<bool>,
}

impl DebugHookManager {
    /// Create a manager with the built-in masking table.
    pub fn new(vms: Rc<VmManager>) -> Self {
        Self::with_mask_table(vms, MaskTable::builtin())
    }

    pub fn with_mask_table(vms: Rc<VmManager>, masking: MaskTable) -> Self {
        Self {
            vms,
            registry: HookRegistry::new(),
            masking,
            dispatching: Cell::new(false),
        }
    }

    /// Register a hook. Returns false on duplicate `(category, callback)`
    /// or when the owning VM is not live.
    pub fn add_hook(
        &self,
        category: HookCategory,
        owner: VmId,
        callback: Function,
        allowed_names: impl IntoIterator<Item = String>,
    ) -> bool {
        if self.vms.get(owner).is_none() {
            debug!(category = category.name(), "rejected hook for dead VM");
            return false;
        }
        self.registry.add(
            category,
            HookEntry {
                callback,
                owner,
                allowed_names: allowed_names.into_iter().collect::<HashSet<_>>(),
            },
        )
    }

    /// Remove a hook. Returns false if no matching entry exists.
    pub fn remove_hook(&self, category: HookCategory, callback: &Function) -> bool {
        self.registry.remove(category, callback)
    }

    /// Number of hooks registered for a category.
    pub fn hook_count(&self, category: HookCategory) -> usize {
        self.registry.len(category)
    }

    /// Sweep every hook owned by a VM when that VM is torn down.
    pub fn on_vm_teardown(&self, vm: VmId) {
        self.registry.remove_all_for_vm(vm);
        debug!(vm = vm.0, "removed hooks for VM");
    }

    /// Called before an instrumented native function runs. Returns false if
    /// the call should be skipped.
    pub fn on_pre_function_call(&self, name: &str, allowed: bool, args: &[ScriptValue]) -> bool {
        self.dispatch_function(HookCategory::PreFunction, name, allowed, args)
    }

    /// Called after an instrumented native function ran.
    pub fn on_post_function_call(&self, name: &str, args: &[ScriptValue]) {
        self.dispatch_function(HookCategory::PostFunction, name, true, args);
    }

    /// Called before an event is dispatched. Returns false if the event
    /// should be skipped.
    pub fn on_pre_event(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
    ) -> bool {
        self.dispatch_event(HookCategory::PreEvent, name, args, source, client)
    }

    /// Called after an event was dispatched.
    pub fn on_post_event(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
    ) {
        self.dispatch_event(HookCategory::PostEvent, name, args, source, client);
    }

    /// Called before a scripted event handler runs. Returns false if the
    /// handler should be skipped.
    pub fn on_pre_event_handler(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
        handler: &EventHandlerRef,
    ) -> bool {
        self.dispatch_event_handler(
            HookCategory::PreEventHandler,
            name,
            args,
            source,
            client,
            handler,
        )
    }

    /// Called after a scripted event handler ran.
    pub fn on_post_event_handler(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
        handler: &EventHandlerRef,
    ) {
        self.dispatch_event_handler(
            HookCategory::PostEventHandler,
            name,
            args,
            source,
            client,
            handler,
        );
    }

    fn dispatch_function(
        &self,
        category: HookCategory,
        name: &str,
        allowed: bool,
        args: &[ScriptValue],
    ) -> bool {
        if self.registry.is_empty(category) {
            return true;
        }

        let must = filter::must_be_explicitly_allowed(name);
        let entries = self.registry.snapshot(category);
        if !filter::is_name_allowed(name, &entries, must) {
            return true;
        }

        let (source, site) = self.current_source_and_site();
        let payload =
            context::function_call_payload(source, name, allowed, &site, args, &self.masking);
        self.call_hooks(name, &entries, &payload, must)
    }

    fn dispatch_event(
        &self,
        category: HookCategory,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
    ) -> bool {
        if self.registry.is_empty(category) {
            return true;
        }

        let must = filter::must_be_explicitly_allowed(name);
        let entries = self.registry.snapshot(category);
        if !filter::is_name_allowed(name, &entries, must) {
            return true;
        }

        let (event_resource, site) = self.current_source_and_site();
        let payload = context::event_payload(event_resource, name, source, client, &site, args);
        self.call_hooks(name, &entries, &payload, must)
    }

    fn dispatch_event_handler(
        &self,
        category: HookCategory,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
        handler: &EventHandlerRef,
    ) -> bool {
        if self.registry.is_empty(category) {
            return true;
        }

        let must = filter::must_be_explicitly_allowed(name);
        let entries = self.registry.snapshot(category);
        if !filter::is_name_allowed(name, &entries, must) {
            return true;
        }

        let (event_resource, event_site) = self.current_source_and_site();
        // The handler's location comes from its own debug info, not the
        // current call stack.
        let handler_resource = self.vms.get(handler.vm).map(|vm| vm.resource());
        let handler_site = function_call_site(&handler.function);

        let payload = context::event_handler_payload(
            event_resource,
            name,
            source,
            client,
            &event_site,
            handler_resource,
            &handler_site,
            args,
        );
        self.call_hooks(name, &entries, &payload, must)
    }

    fn current_source_and_site(&self) -> (Option<ResourceId>, CallSite) {
        match self.vms.current() {
            Some(vm) => (Some(vm.resource()), current_call_site(vm.lua())),
            None => (None, CallSite::default()),
        }
    }

    /// Invoke every matching entry in insertion order. Returns false if any
    /// hook asked for the call to be skipped.
    fn call_hooks(
        &self,
        name: &str,
        entries: &[HookEntry],
        payload: &[ScriptValue],
        must_be_explicitly_allowed: bool,
    ) -> bool {
        let Some(_guard) = DispatchGuard::try_acquire(&self.dispatching) else {
            trace!(hook = name, "suppressed re-entrant dispatch");
            return true;
        };

        let mut skip = false;
        for entry in entries
            .iter()
            .filter(|e| filter::entry_matches(e, name, must_be_explicitly_allowed))
        {
            let Some(vm) = self.vms.get(entry.owner) else {
                debug!(hook = name, vm = entry.owner.0, "skipping hook, VM is gone");
                continue;
            };

            let snapshot = match GlobalsSnapshot::capture(vm.lua()) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(hook = name, error = %e, "failed to snapshot context globals");
                    continue;
                }
            };

            let hook_args: Variadic<ScriptValue> = payload.iter().cloned().collect();
            let result = entry.callback.call::<MultiValue>(hook_args);

            // Restore runs whether the callback returned or raised, so one
            // hook's failure cannot leak corrupted globals to the next.
            if let Err(e) = snapshot.restore() {
                warn!(hook = name, error = %e, "failed to restore context globals");
            }

            match result {
                Ok(returns) => {
                    if wants_skip(&returns) {
                        skip = true;
                    }
                }
                Err(e) => warn!(hook = name, error = %e, "debug hook raised"),
            }
        }

        !skip
    }
}

/// A hook votes to skip by returning the literal string "skip" as its first
/// return value. Anything else means "do not skip".
fn wants_skip(returns: &MultiValue) -> bool {
    match returns.iter().next() {
        Some(Value::String(s)) => s.to_str().map(|s| &*s == "skip").unwrap_or(false),
        _ => false,
    }
}
