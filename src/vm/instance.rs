//! Per-module Lua VM instances.

use mlua::{Lua, Value};

use crate::value::ResourceId;
use crate::{HookError, Result};

/// Identity of a VM instance, stable for its lifetime.
///
/// Hook entries record the id of the VM that registered them so the whole
/// set can be swept when that VM is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmId(pub(crate) u64);

/// A single Lua state owned by one host module/resource.
pub struct ScriptVm {
    id: VmId,
    name: String,
    resource: ResourceId,
    lua: Lua,
}

impl ScriptVm {
    pub(crate) fn new(id: VmId, name: &str, resource: ResourceId) -> Result<Self> {
        let lua = Lua::new();
        Self::apply_sandbox(&lua)?;

        Ok(Self {
            id,
            name: name.to_string(),
            resource,
            lua,
        })
    }

    /// Disable host-environment access from script code.
    fn apply_sandbox(lua: &Lua) -> Result<()> {
        let globals = lua.globals();
        for name in ["os", "io", "loadfile", "dofile", "load", "require", "package"] {
            globals
                .set(name, Value::Nil)
                .map_err(|e| HookError::Script(format!("failed to disable {}: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn id(&self) -> VmId {
        self.id
    }

    /// Name of the owning module/resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Load and run a chunk. The chunk name is what call-site file names
    /// resolve to in hook payloads.
    pub(crate) fn exec(&self, chunk_name: &str, source: &str) -> Result<()> {
        self.lua
            .load(source)
            .set_name(format!("@{}", chunk_name))
            .exec()
            .map_err(|e| HookError::Script(format!("{}: {}", chunk_name, e)))
    }

    /// Set a global value in the Lua environment.
    pub fn set_global<V: mlua::IntoLua>(&self, name: &str, value: V) -> Result<()> {
        self.lua
            .globals()
            .set(name, value)
            .map_err(|e| HookError::Script(format!("failed to set global '{}': {}", name, e)))
    }

    /// Get a global value from the Lua environment.
    pub fn get_global<V: mlua::FromLua>(&self, name: &str) -> Result<V> {
        self.lua
            .globals()
            .get(name)
            .map_err(|e| HookError::Script(format!("failed to get global '{}': {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vm() -> ScriptVm {
        ScriptVm::new(VmId(1), "test", ResourceId(1)).unwrap()
    }

    #[test]
    fn test_basic_execution() {
        let vm = test_vm();
        vm.exec("test.lua", "x = 1 + 2").unwrap();
        assert_eq!(vm.get_global::<i32>("x").unwrap(), 3);
    }

    #[test]
    fn test_sandbox_os_disabled() {
        let vm = test_vm();
        assert!(vm.exec("test.lua", "os.time()").is_err());
    }

    #[test]
    fn test_sandbox_io_disabled() {
        let vm = test_vm();
        assert!(vm.exec("test.lua", "io.open('/etc/passwd', 'r')").is_err());
    }

    #[test]
    fn test_set_and_get_global() {
        let vm = test_vm();
        vm.set_global("answer", 42).unwrap();
        assert_eq!(vm.get_global::<i32>("answer").unwrap(), 42);
    }

    #[test]
    fn test_syntax_error() {
        let vm = test_vm();
        let result = vm.exec("bad.lua", "this is not valid lua");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("bad.lua"));
    }
}
