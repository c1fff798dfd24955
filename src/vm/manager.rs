//! VM instance bookkeeping.
//!
//! Tracks every live [`ScriptVm`] by id and maintains a stack of the VMs
//! currently executing script code. The top of that stack is the "currently
//! executing module" reported as the source identity in hook payloads.
//!
//! Everything here is single-threaded by design: dispatch, registration, and
//! VM management all happen on the host's script thread, so interior
//! mutability via `RefCell`/`Cell` is sufficient.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::instance::{ScriptVm, VmId};
use crate::value::ResourceId;
use crate::Result;

/// Registry of live VM instances plus the current-execution stack.
pub struct VmManager {
    vms: RefCell<HashMap<VmId, Rc<ScriptVm>>>,
    exec_stack: RefCell<Vec<VmId>>,
    next_id: Cell<u64>,
}

impl VmManager {
    pub fn new() -> Self {
        Self {
            vms: RefCell::new(HashMap::new()),
            exec_stack: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Create and register a new VM for the given module.
    pub fn create_vm(&self, name: &str, resource: ResourceId) -> Result<Rc<ScriptVm>> {
        let id = VmId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let vm = Rc::new(ScriptVm::new(id, name, resource)?);
        self.vms.borrow_mut().insert(id, Rc::clone(&vm));
        debug!(vm = id.0, module = name, "created VM");
        Ok(vm)
    }

    /// Look up a live VM by id.
    pub fn get(&self, id: VmId) -> Option<Rc<ScriptVm>> {
        self.vms.borrow().get(&id).cloned()
    }

    /// Drop a VM from the registry. Returns the instance if it was live.
    pub fn remove(&self, id: VmId) -> Option<Rc<ScriptVm>> {
        let vm = self.vms.borrow_mut().remove(&id);
        if vm.is_some() {
            debug!(vm = id.0, "removed VM");
        }
        vm
    }

    pub fn len(&self) -> usize {
        self.vms.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vms.borrow().is_empty()
    }

    /// The VM currently executing script code, if any.
    pub fn current(&self) -> Option<Rc<ScriptVm>> {
        let id = *self.exec_stack.borrow().last()?;
        self.get(id)
    }

    /// Mark a VM as executing script code for the lifetime of the returned
    /// scope (nested scopes stack). Every path that runs script code on a
    /// VM, chunk execution and handler invocation alike, must hold one so
    /// that `current()` attributes nested native calls to the right module.
    pub fn enter(&self, id: VmId) -> ExecutionScope<'_> {
        self.exec_stack.borrow_mut().push(id);
        ExecutionScope { manager: self }
    }

    /// Run a chunk on the given VM, tracking it as the currently executing
    /// module for the duration.
    pub fn execute(&self, vm: &Rc<ScriptVm>, chunk_name: &str, source: &str) -> Result<()> {
        let _scope = self.enter(vm.id());
        vm.exec(chunk_name, source)
    }
}

/// Scoped marker for a VM on the execution stack; pops on drop.
pub struct ExecutionScope<'a> {
    manager: &'a VmManager,
}

impl Drop for ExecutionScope<'_> {
    fn drop(&mut self) {
        self.manager.exec_stack.borrow_mut().pop();
    }
}

impl Default for VmManager {
    fn default() -> Self {
        Self::new()
    }
}
