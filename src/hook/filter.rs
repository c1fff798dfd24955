//! Name filtering policy for hook entries.

use super::registry::HookEntry;

/// Names that hooks only observe when explicitly allow-listed.
///
/// These are the registration operations of the hook engine itself; tracing
/// them by default would make every hook observe its own management calls.
pub fn must_be_explicitly_allowed(name: &str) -> bool {
    name == "addDebugHook" || name == "removeDebugHook"
}

/// Whether a single entry applies to the given name.
pub fn entry_matches(entry: &HookEntry, name: &str, must_be_explicitly_allowed: bool) -> bool {
    if entry.allowed_names.is_empty() && !must_be_explicitly_allowed {
        return true;
    }
    entry.allowed_names.contains(name)
}

/// Whether any entry in the list applies to the given name. Cheap pre-check
/// run before a payload is built.
pub fn is_name_allowed(
    name: &str,
    entries: &[HookEntry],
    must_be_explicitly_allowed: bool,
) -> bool {
    entries
        .iter()
        .any(|entry| entry_matches(entry, name, must_be_explicitly_allowed))
}
