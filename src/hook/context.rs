//! Hook payload construction.
//!
//! Each interception-point family has a fixed payload shape; hooks rely on
//! the field order, so these builders are the single place it is defined.

use super::masking::MaskTable;
use crate::value::{ElementId, ResourceId, ScriptValue};
use crate::vm::CallSite;

fn resource_or_nil(resource: Option<ResourceId>) -> ScriptValue {
    match resource {
        Some(id) => ScriptValue::Resource(id),
        None => ScriptValue::Nil,
    }
}

fn element_or_nil(element: Option<ElementId>) -> ScriptValue {
    match element {
        Some(id) => ScriptValue::Element(id),
        None => ScriptValue::Nil,
    }
}

/// `[source, name, allowed, file, line, ...maskedArgs]`
pub fn function_call_payload(
    source: Option<ResourceId>,
    name: &str,
    allowed: bool,
    site: &CallSite,
    args: &[ScriptValue],
    masking: &MaskTable,
) -> Vec<ScriptValue> {
    let mut masked = args.to_vec();
    masking.mask(name, &mut masked);

    let mut payload = vec![
        resource_or_nil(source),
        ScriptValue::from(name),
        ScriptValue::Boolean(allowed),
        ScriptValue::from(site.file.as_str()),
        ScriptValue::Number(site.line as f64),
    ];
    payload.extend(masked);
    payload
}

/// `[source, name, eventSource, eventClient, file, line, ...args]`
///
/// Event arguments are not subject to the masking table.
pub fn event_payload(
    source: Option<ResourceId>,
    name: &str,
    event_source: ElementId,
    event_client: Option<ElementId>,
    site: &CallSite,
    args: &[ScriptValue],
) -> Vec<ScriptValue> {
    let mut payload = vec![
        resource_or_nil(source),
        ScriptValue::from(name),
        ScriptValue::Element(event_source),
        element_or_nil(event_client),
        ScriptValue::from(site.file.as_str()),
        ScriptValue::Number(site.line as f64),
    ];
    payload.extend(args.iter().cloned());
    payload
}

/// `[eventSource, name, eventSource, eventClient, eventFile, eventLine,
///   handlerSource, handlerFile, handlerLine, ...args]`
///
/// The event's trigger site and the handler's registration site may live in
/// different modules; both locations are reported independently.
#[allow(clippy::too_many_arguments)]
pub fn event_handler_payload(
    event_resource: Option<ResourceId>,
    name: &str,
    event_source: ElementId,
    event_client: Option<ElementId>,
    event_site: &CallSite,
    handler_resource: Option<ResourceId>,
    handler_site: &CallSite,
    args: &[ScriptValue],
) -> Vec<ScriptValue> {
    let mut payload = vec![
        resource_or_nil(event_resource),
        ScriptValue::from(name),
        ScriptValue::Element(event_source),
        element_or_nil(event_client),
        ScriptValue::from(event_site.file.as_str()),
        ScriptValue::Number(event_site.line as f64),
        resource_or_nil(handler_resource),
        ScriptValue::from(handler_site.file.as_str()),
        ScriptValue::Number(handler_site.line as f64),
    ];
    payload.extend(args.iter().cloned());
    payload
}
