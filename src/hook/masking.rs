//! Redaction of sensitive call arguments.
//!
//! Hook callbacks observe the arguments of instrumented native calls. For a
//! handful of functions those arguments carry credentials; the masking table
//! replaces the configured positions with a fixed marker before the payload
//! ever reaches a hook.

use std::collections::HashMap;

use crate::config::MaskingConfig;
use crate::value::ScriptValue;

/// Default redaction marker.
pub const DEFAULT_MARKER: &str = "***";

/// Read-only mapping from function name to the zero-based argument positions
/// that must be redacted. Built once at startup; swappable for testing.
#[derive(Debug, Clone)]
pub struct MaskTable {
    rules: HashMap<String, Vec<usize>>,
    marker: String,
}

impl MaskTable {
    pub fn new(rules: HashMap<String, Vec<usize>>, marker: &str) -> Self {
        Self {
            rules,
            marker: marker.to_string(),
        }
    }

    /// The built-in table: credential-carrying account and database
    /// functions.
    pub fn builtin() -> Self {
        Self::new(builtin_rules(), DEFAULT_MARKER)
    }

    /// An empty table, masking nothing.
    pub fn empty() -> Self {
        Self::new(HashMap::new(), DEFAULT_MARKER)
    }

    pub fn from_config(config: &MaskingConfig) -> Self {
        Self::new(config.functions.clone(), &config.redaction)
    }

    /// Redact the configured positions of `args` in place. Positions beyond
    /// the argument count are ignored; unconfigured names are a no-op.
    pub fn mask(&self, function_name: &str, args: &mut [ScriptValue]) {
        let Some(positions) = self.rules.get(function_name) else {
            return;
        };
        for &position in positions {
            if let Some(slot) = args.get_mut(position) {
                *slot = ScriptValue::String(self.marker.clone());
            }
        }
    }
}

impl Default for MaskTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The built-in masking rules. Position comments give the full signature
/// with the masked slots called out.
pub(crate) fn builtin_rules() -> HashMap<String, Vec<usize>> {
    let mut rules = HashMap::new();
    // type, 1=host, 2=username, 3=password, options
    rules.insert("dbConnect".to_string(), vec![1, 2, 3]);
    // player, account, 2=password
    rules.insert("logIn".to_string(), vec![2]);
    // name, 1=password
    rules.insert("addAccount".to_string(), vec![1]);
    // name, 1=password
    rules.insert("getAccount".to_string(), vec![1]);
    // account, 1=password
    rules.insert("setAccountPassword".to_string(), vec![1]);
    rules
}
