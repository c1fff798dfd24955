//! Host facade tying VM management and hook dispatch together.

use std::rc::Rc;

use mlua::Variadic;
use tracing::{info, warn};

use crate::api;
use crate::config::Config;
use crate::hook::dispatch::GlobalsSnapshot;
use crate::hook::{DebugHookManager, EventHandlerRef, MaskTable};
use crate::value::{ElementId, ResourceId, ScriptValue};
use crate::vm::{ScriptVm, VmId, VmManager};
use crate::Result;

/// The embedding surface for a host application: creates and tears down
/// script VMs, runs chunks, and drives the event-side interception points.
pub struct ScriptHost {
    vms: Rc<VmManager>,
    hooks: Rc<DebugHookManager>,
}

impl ScriptHost {
    /// Create a host with the built-in masking table.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let vms = Rc::new(VmManager::new());
        let hooks = Rc::new(DebugHookManager::with_mask_table(
            Rc::clone(&vms),
            MaskTable::from_config(&config.masking),
        ));
        Self { vms, hooks }
    }

    pub fn vms(&self) -> &Rc<VmManager> {
        &self.vms
    }

    pub fn hooks(&self) -> &Rc<DebugHookManager> {
        &self.hooks
    }

    /// Create a VM for a module, with the debug hook API wired in.
    pub fn create_vm(&self, name: &str, resource: ResourceId) -> Result<Rc<ScriptVm>> {
        let vm = self.vms.create_vm(name, resource)?;
        api::register_debug_api(&self.hooks, &vm)?;
        info!(module = name, "created script VM");
        Ok(vm)
    }

    /// Register an instrumented host native on a VM.
    pub fn register_native<F, R>(&self, vm: &ScriptVm, name: &'static str, f: F) -> Result<()>
    where
        F: Fn(&mlua::Lua, &mlua::MultiValue) -> mlua::Result<R> + 'static,
        R: mlua::IntoLuaMulti,
    {
        api::register_native(&self.hooks, vm, name, f)
    }

    /// Run a chunk on a VM, tracking it as the currently executing module.
    pub fn run(&self, vm: &Rc<ScriptVm>, chunk_name: &str, source: &str) -> Result<()> {
        self.vms.execute(vm, chunk_name, source)
    }

    /// Tear down a VM: sweep its hooks, then drop it from the registry.
    pub fn teardown_vm(&self, id: VmId) {
        self.hooks.on_vm_teardown(id);
        if self.vms.remove(id).is_some() {
            info!(vm = id.0, "tore down script VM");
        }
    }

    /// Dispatch an event to the given scripted handlers, driving the four
    /// event-side interception points. Returns false if a pre-event hook
    /// skipped the event.
    ///
    /// This is deliberately not an event bus: handler registration and
    /// lookup belong to the host. What it provides is the protocol around
    /// one dispatch, including the conventional context globals (`source`,
    /// `eventName`, `client`, `sourceResource`) set for each handler call.
    pub fn trigger_event(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
        handlers: &[EventHandlerRef],
    ) -> bool {
        if !self.hooks.on_pre_event(name, args, source, client) {
            return false;
        }

        for handler in handlers {
            if !self
                .hooks
                .on_pre_event_handler(name, args, source, client, handler)
            {
                continue;
            }
            self.call_handler(name, args, source, client, handler);
            self.hooks
                .on_post_event_handler(name, args, source, client, handler);
        }

        self.hooks.on_post_event(name, args, source, client);
        true
    }

    fn call_handler(
        &self,
        name: &str,
        args: &[ScriptValue],
        source: ElementId,
        client: Option<ElementId>,
        handler: &EventHandlerRef,
    ) {
        let Some(vm) = self.vms.get(handler.vm) else {
            warn!(event = name, "dropping handler for dead VM");
            return;
        };

        let snapshot = match GlobalsSnapshot::capture(vm.lua()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(event = name, error = %e, "failed to snapshot handler globals");
                return;
            }
        };

        let source_resource = self.vms.current().map(|current| current.resource());
        let context_ok = vm
            .set_global("source", ScriptValue::Element(source))
            .and_then(|_| vm.set_global("eventName", name))
            .and_then(|_| {
                vm.set_global(
                    "client",
                    client.map_or(ScriptValue::Nil, ScriptValue::Element),
                )
            })
            .and_then(|_| {
                vm.set_global(
                    "sourceResource",
                    source_resource.map_or(ScriptValue::Nil, ScriptValue::Resource),
                )
            });

        if context_ok.is_ok() {
            // The handler's VM is the currently executing module while it
            // runs, so instrumented natives it calls attribute to it.
            let _scope = self.vms.enter(handler.vm);
            let handler_args: Variadic<ScriptValue> = args.iter().cloned().collect();
            if let Err(e) = handler.function.call::<()>(handler_args) {
                warn!(event = name, error = %e, "event handler raised");
            }
        }

        if let Err(e) = snapshot.restore() {
            warn!(event = name, error = %e, "failed to restore handler globals");
        }
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}
