//! VM-portable script values.
//!
//! Hook payloads cross VM boundaries: an argument observed in one VM may be
//! delivered to a hook callback living in another. `ScriptValue` is the
//! owned, state-independent representation used for that transfer, with
//! opaque host identities (`ElementId`, `ResourceId`) passed through as
//! userdata.

use mlua::{FromLua, IntoLua, Lua, MetaMethod, Result as LuaResult, UserData, UserDataRef, Value};

/// Opaque identity of a host entity (player, object, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

/// Opaque identity of a host module/resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u32);

impl UserData for ElementId {
    fn add_fields<F: mlua::UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.0));
    }

    fn add_methods<M: mlua::UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("element:{}", this.0))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<ElementId>| {
            Ok(this.0 == other.0)
        });
    }
}

impl UserData for ResourceId {
    fn add_fields<F: mlua::UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.0));
    }

    fn add_methods<M: mlua::UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("resource:{}", this.0))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<ResourceId>| {
            Ok(this.0 == other.0)
        });
    }
}

/// A single value in a hook payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Element(ElementId),
    Resource(ResourceId),
}

impl ScriptValue {
    /// Convert a Lua value, mapping types that cannot cross a VM boundary
    /// (tables, functions, threads, ...) to a descriptive placeholder string.
    ///
    /// Used when capturing raw native-call arguments for hook payloads, where
    /// losing fidelity on an exotic argument is preferable to failing the call.
    pub fn from_lua_lossy(value: &Value) -> ScriptValue {
        match value {
            Value::Nil => ScriptValue::Nil,
            Value::Boolean(b) => ScriptValue::Boolean(*b),
            Value::Integer(i) => ScriptValue::Number(*i as f64),
            Value::Number(n) => ScriptValue::Number(*n),
            Value::String(s) => {
                ScriptValue::String(s.to_str().map(|s| s.to_string()).unwrap_or_default())
            }
            Value::UserData(ud) => {
                if let Ok(id) = ud.borrow::<ElementId>() {
                    ScriptValue::Element(*id)
                } else if let Ok(id) = ud.borrow::<ResourceId>() {
                    ScriptValue::Resource(*id)
                } else {
                    ScriptValue::String("[userdata]".to_string())
                }
            }
            Value::Table(_) => ScriptValue::String("[table]".to_string()),
            Value::Function(_) => ScriptValue::String("[function]".to_string()),
            Value::Thread(_) => ScriptValue::String("[thread]".to_string()),
            Value::LightUserData(_) => ScriptValue::String("[lightuserdata]".to_string()),
            Value::Error(e) => ScriptValue::String(format!("[error: {}]", e)),
            _ => ScriptValue::String("[unknown]".to_string()),
        }
    }
}

impl IntoLua for ScriptValue {
    fn into_lua(self, lua: &Lua) -> LuaResult<Value> {
        Ok(match self {
            ScriptValue::Nil => Value::Nil,
            ScriptValue::Boolean(b) => Value::Boolean(b),
            ScriptValue::Number(n) => Value::Number(n),
            ScriptValue::String(s) => Value::String(lua.create_string(&s)?),
            ScriptValue::Element(id) => Value::UserData(lua.create_userdata(id)?),
            ScriptValue::Resource(id) => Value::UserData(lua.create_userdata(id)?),
        })
    }
}

impl FromLua for ScriptValue {
    fn from_lua(value: Value, _lua: &Lua) -> LuaResult<Self> {
        match value {
            Value::Nil => Ok(ScriptValue::Nil),
            Value::Boolean(b) => Ok(ScriptValue::Boolean(b)),
            Value::Integer(i) => Ok(ScriptValue::Number(i as f64)),
            Value::Number(n) => Ok(ScriptValue::Number(n)),
            Value::String(s) => Ok(ScriptValue::String(s.to_str()?.to_string())),
            Value::UserData(ud) => {
                if let Ok(id) = ud.borrow::<ElementId>() {
                    Ok(ScriptValue::Element(*id))
                } else if let Ok(id) = ud.borrow::<ResourceId>() {
                    Ok(ScriptValue::Resource(*id))
                } else {
                    Err(mlua::Error::FromLuaConversionError {
                        from: "userdata",
                        to: "ScriptValue".to_string(),
                        message: Some("unknown userdata type".to_string()),
                    })
                }
            }
            other => Err(mlua::Error::FromLuaConversionError {
                from: other.type_name(),
                to: "ScriptValue".to_string(),
                message: None,
            }),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(s)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Boolean(b)
    }
}
