//! Hook storage: six insertion-ordered lists of registered callbacks.

use std::cell::RefCell;
use std::collections::HashSet;

use mlua::Function;
use tracing::debug;

use crate::vm::VmId;

/// The six interception points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCategory {
    PreEvent,
    PostEvent,
    PreFunction,
    PostFunction,
    PreEventHandler,
    PostEventHandler,
}

impl HookCategory {
    pub const ALL: [HookCategory; 6] = [
        HookCategory::PreEvent,
        HookCategory::PostEvent,
        HookCategory::PreFunction,
        HookCategory::PostFunction,
        HookCategory::PreEventHandler,
        HookCategory::PostEventHandler,
    ];

    /// Script-facing category name, as accepted by `addDebugHook`.
    pub fn name(self) -> &'static str {
        match self {
            HookCategory::PreEvent => "preEvent",
            HookCategory::PostEvent => "postEvent",
            HookCategory::PreFunction => "preFunction",
            HookCategory::PostFunction => "postFunction",
            HookCategory::PreEventHandler => "preEventHandler",
            HookCategory::PostEventHandler => "postEventHandler",
        }
    }

    pub fn from_name(name: &str) -> Option<HookCategory> {
        HookCategory::ALL.into_iter().find(|c| c.name() == name)
    }

    fn index(self) -> usize {
        match self {
            HookCategory::PreEvent => 0,
            HookCategory::PostEvent => 1,
            HookCategory::PreFunction => 2,
            HookCategory::PostFunction => 3,
            HookCategory::PreEventHandler => 4,
            HookCategory::PostEventHandler => 5,
        }
    }
}

/// One registered hook.
///
/// The callback is a handle into the owning VM's registry; the VM owns the
/// underlying callable's lifetime. Entries are never mutated after
/// registration, only removed.
#[derive(Clone)]
pub struct HookEntry {
    pub callback: Function,
    pub owner: VmId,
    /// Names this hook is restricted to. Empty means "every name", except
    /// for names that must be explicitly allowed (see the filter module).
    pub allowed_names: HashSet<String>,
}

impl HookEntry {
    /// Callback identity: the underlying Lua function pointer. Two handles
    /// to the same function compare equal; closures created separately do
    /// not.
    pub fn matches_callback(&self, callback: &Function) -> bool {
        self.callback.to_pointer() == callback.to_pointer()
    }
}

/// Per-category hook lists. Iteration order equals registration order; that
/// ordering is an observable contract, not an implementation detail.
pub struct HookRegistry {
    lists: [RefCell<Vec<HookEntry>>; 6],
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            lists: Default::default(),
        }
    }

    fn list(&self, category: HookCategory) -> &RefCell<Vec<HookEntry>> {
        &self.lists[category.index()]
    }

    /// Append a hook. Fails on duplicate `(category, callback)`.
    pub fn add(&self, category: HookCategory, entry: HookEntry) -> bool {
        let mut list = self.list(category).borrow_mut();
        if list.iter().any(|e| e.matches_callback(&entry.callback)) {
            debug!(category = category.name(), "rejected duplicate hook");
            return false;
        }
        list.push(entry);
        true
    }

    /// Remove a hook. Fails if no matching entry exists; no side effect on
    /// failure.
    pub fn remove(&self, category: HookCategory, callback: &Function) -> bool {
        let mut list = self.list(category).borrow_mut();
        match list.iter().position(|e| e.matches_callback(callback)) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every hook owned by the given VM, across all categories,
    /// preserving the relative order of surviving entries.
    pub fn remove_all_for_vm(&self, owner: VmId) {
        for category in HookCategory::ALL {
            self.list(category).borrow_mut().retain(|e| e.owner != owner);
        }
    }

    pub fn is_empty(&self, category: HookCategory) -> bool {
        self.list(category).borrow().is_empty()
    }

    pub fn len(&self, category: HookCategory) -> usize {
        self.list(category).borrow().len()
    }

    /// Clone the category's entries for dispatch. Iterating a snapshot keeps
    /// the lists mutable from within hook callbacks (a hook may register or
    /// remove hooks while a dispatch is in flight).
    pub fn snapshot(&self, category: HookCategory) -> Vec<HookEntry> {
        self.list(category).borrow().clone()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
