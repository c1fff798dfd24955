//! End-to-end tests for hook dispatch through real Lua scripts.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Table, Value};

use scripthook::{
    Config, ElementId, EventHandlerRef, HookCategory, ResourceId, ScriptHost, ScriptValue,
};

#[test]
fn pre_function_hook_sees_full_payload() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();
    host.register_native(&vm, "setElementPosition", |_, _| Ok(true))
        .unwrap();
    vm.set_global("el", ScriptValue::Element(ElementId(12)))
        .unwrap();

    let script = "\
addDebugHook('preFunction', function(source, name, allowed, file, line, ...)\n\
    captured = { source = source, name = name, allowed = allowed,\n\
                 file = file, line = line, n = select('#', ...), ... }\n\
end)\n\
setElementPosition(el, 10.0, 20.0, 30.0)\n";
    host.run(&vm, "server.lua", script).unwrap();

    let captured: Table = vm.get_global("captured").unwrap();
    assert_eq!(
        captured.get::<ScriptValue>("source").unwrap(),
        ScriptValue::Resource(ResourceId(1))
    );
    assert_eq!(
        captured.get::<String>("name").unwrap(),
        "setElementPosition"
    );
    assert!(captured.get::<bool>("allowed").unwrap());
    assert_eq!(captured.get::<String>("file").unwrap(), "server.lua");
    assert_eq!(captured.get::<i64>("line").unwrap(), 5);

    // setElementPosition is not in the masking table; the original
    // arguments come through untouched.
    assert_eq!(captured.get::<i64>("n").unwrap(), 4);
    assert_eq!(
        captured.get::<ScriptValue>(1).unwrap(),
        ScriptValue::Element(ElementId(12))
    );
    assert_eq!(captured.get::<f64>(2).unwrap(), 10.0);
    assert_eq!(captured.get::<f64>(4).unwrap(), 30.0);
}

#[test]
fn masked_argument_hidden_from_hook_but_not_native() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    let native_password = Rc::new(RefCell::new(String::new()));
    let slot = Rc::clone(&native_password);
    host.register_native(&vm, "logIn", move |_, raw| {
        if let Some(Value::String(s)) = raw.iter().nth(2) {
            *slot.borrow_mut() = s.to_str()?.to_string();
        }
        Ok(true)
    })
    .unwrap();

    host.run(
        &vm,
        "auth.lua",
        "addDebugHook('preFunction', function(source, name, allowed, file, line, a1, a2, a3)
             hook_password = a3
         end)
         logIn('player', 'account', 'hunter2')",
    )
    .unwrap();

    assert_eq!(vm.get_global::<String>("hook_password").unwrap(), "***");
    assert_eq!(*native_password.borrow(), "hunter2");
}

#[test]
fn event_dispatch_drives_all_four_interception_points() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.run(
        &vm,
        "handlers.lua",
        "log = ''
         function onWasted(ammo)
             handler_ammo = ammo
             handler_source = source.id
             handler_event = eventName
             handler_client = client.id
         end
         addDebugHook('preEvent', function() log = log .. 'preEvent;' end)
         addDebugHook('postEvent', function() log = log .. 'postEvent;' end)
         addDebugHook('preEventHandler', function() log = log .. 'preHandler;' end)
         addDebugHook('postEventHandler', function() log = log .. 'postHandler;' end)",
    )
    .unwrap();

    let handler = EventHandlerRef {
        vm: vm.id(),
        function: vm.get_global("onWasted").unwrap(),
    };
    let delivered = host.trigger_event(
        "onPlayerWasted",
        &[ScriptValue::Number(180.0)],
        ElementId(9),
        Some(ElementId(2)),
        &[handler],
    );
    assert!(delivered);

    assert_eq!(
        vm.get_global::<String>("log").unwrap(),
        "preEvent;preHandler;postHandler;postEvent;"
    );
    assert_eq!(vm.get_global::<f64>("handler_ammo").unwrap(), 180.0);
    assert_eq!(vm.get_global::<u32>("handler_source").unwrap(), 9);
    assert_eq!(
        vm.get_global::<String>("handler_event").unwrap(),
        "onPlayerWasted"
    );
    assert_eq!(vm.get_global::<u32>("handler_client").unwrap(), 2);

    // The context globals were restored after the handler call.
    assert!(matches!(
        vm.get_global::<Value>("source").unwrap(),
        Value::Nil
    ));
    assert!(matches!(
        vm.get_global::<Value>("eventName").unwrap(),
        Value::Nil
    ));
}

#[test]
fn pre_event_skip_suppresses_handlers_and_post_event() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.run(
        &vm,
        "handlers.lua",
        "handler_calls = 0
         post_calls = 0
         function onWasted() handler_calls = handler_calls + 1 end
         addDebugHook('preEvent', function() return 'skip' end)
         addDebugHook('postEvent', function() post_calls = post_calls + 1 end)",
    )
    .unwrap();

    let handler = EventHandlerRef {
        vm: vm.id(),
        function: vm.get_global("onWasted").unwrap(),
    };
    let delivered = host.trigger_event("onPlayerWasted", &[], ElementId(9), None, &[handler]);

    assert!(!delivered);
    assert_eq!(vm.get_global::<i64>("handler_calls").unwrap(), 0);
    assert_eq!(vm.get_global::<i64>("post_calls").unwrap(), 0);
}

#[test]
fn pre_handler_skip_suppresses_one_handler_only() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.run(
        &vm,
        "handlers.lua",
        "calls = ''
         post_handler_calls = 0
         function first() calls = calls .. 'first;' end
         function second() calls = calls .. 'second;' end
         addDebugHook('preEventHandler', function(res, name, src, client, file, line, hres, hfile, hline)
             if hline == 3 then return 'skip' end
         end)
         addDebugHook('postEventHandler', function()
             post_handler_calls = post_handler_calls + 1
         end)",
    )
    .unwrap();

    let first = EventHandlerRef {
        vm: vm.id(),
        function: vm.get_global("first").unwrap(),
    };
    let second = EventHandlerRef {
        vm: vm.id(),
        function: vm.get_global("second").unwrap(),
    };
    let delivered =
        host.trigger_event("onPlayerWasted", &[], ElementId(9), None, &[first, second]);

    // The event itself still goes through; only the first handler (defined
    // on line 3) was vetoed, and its post hook was suppressed with it.
    assert!(delivered);
    assert_eq!(vm.get_global::<String>("calls").unwrap(), "second;");
    assert_eq!(vm.get_global::<i64>("post_handler_calls").unwrap(), 1);
}

#[test]
fn observer_vm_sees_calls_from_other_vms() {
    let host = ScriptHost::new();
    let gamemode = host.create_vm("gamemode", ResourceId(1)).unwrap();
    let observer = host.create_vm("monitor", ResourceId(2)).unwrap();

    host.register_native(&gamemode, "spawnPlayer", |_, _| Ok(true))
        .unwrap();

    host.run(
        &observer,
        "monitor.lua",
        "addDebugHook('preFunction', function(source, name)
             seen_name = name
             seen_resource = source.id
         end)",
    )
    .unwrap();
    host.run(&gamemode, "server.lua", "spawnPlayer()").unwrap();

    assert_eq!(
        observer.get_global::<String>("seen_name").unwrap(),
        "spawnPlayer"
    );
    // The source identity is the module that made the call, not the one
    // observing it.
    assert_eq!(observer.get_global::<u32>("seen_resource").unwrap(), 1);
}

#[test]
fn teardown_removes_hooks_for_that_vm_only() {
    let host = ScriptHost::new();
    let gamemode = host.create_vm("gamemode", ResourceId(1)).unwrap();
    let observer = host.create_vm("monitor", ResourceId(2)).unwrap();

    host.register_native(&gamemode, "spawnPlayer", |_, _| Ok(true))
        .unwrap();
    host.run(
        &gamemode,
        "server.lua",
        "local_calls = 0
         addDebugHook('preFunction', function() local_calls = local_calls + 1 end)",
    )
    .unwrap();
    host.run(
        &observer,
        "monitor.lua",
        "addDebugHook('preFunction', function() end)",
    )
    .unwrap();
    assert_eq!(host.hooks().hook_count(HookCategory::PreFunction), 2);

    host.teardown_vm(observer.id());
    assert_eq!(host.hooks().hook_count(HookCategory::PreFunction), 1);

    // The surviving hook still fires.
    host.run(&gamemode, "server.lua", "spawnPlayer()").unwrap();
    assert_eq!(gamemode.get_global::<i64>("local_calls").unwrap(), 1);
}

#[test]
fn native_called_from_event_handler_attributes_handler_module() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.register_native(&vm, "spawnPlayer", |_, _| Ok(true))
        .unwrap();
    host.run(
        &vm,
        "handlers.lua",
        "function onWasted() spawnPlayer() end
         addDebugHook('preFunction', function(source, name)
             if name == 'spawnPlayer' then seen_source = source end
         end)",
    )
    .unwrap();

    let handler = EventHandlerRef {
        vm: vm.id(),
        function: vm.get_global("onWasted").unwrap(),
    };
    assert!(host.trigger_event("onPlayerWasted", &[], ElementId(9), None, &[handler]));

    // The handler's module is the source identity of the nested call, not
    // the host-side trigger (which has no module of its own).
    assert_eq!(
        vm.get_global::<ScriptValue>("seen_source").unwrap(),
        ScriptValue::Resource(ResourceId(1))
    );
}

#[test]
fn nested_instrumented_call_from_hook_is_not_observed() {
    let host = ScriptHost::new();
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.register_native(&vm, "spawnPlayer", |_, _| Ok(true))
        .unwrap();
    host.register_native(&vm, "getTickCount", |_, _| Ok(250))
        .unwrap();

    host.run(
        &vm,
        "server.lua",
        "observed = 0
         addDebugHook('preFunction', function(source, name)
             observed = observed + 1
             -- Instrumented call from inside a hook: the nested dispatch
             -- collapses to allow, so the native still runs unobserved.
             ticks = getTickCount()
         end)
         spawnPlayer()",
    )
    .unwrap();

    assert_eq!(vm.get_global::<i64>("observed").unwrap(), 1);
    assert_eq!(vm.get_global::<i64>("ticks").unwrap(), 250);
}

#[test]
fn custom_masking_table_from_config() {
    let config = Config::parse(
        "[masking]\n\
         redaction = '<hidden>'\n\
         [masking.functions]\n\
         joinTeam = [1]\n",
    )
    .unwrap();
    let host = ScriptHost::with_config(&config);
    let vm = host.create_vm("gamemode", ResourceId(1)).unwrap();

    host.register_native(&vm, "joinTeam", |_, _| Ok(true))
        .unwrap();
    host.register_native(&vm, "logIn", |_, _| Ok(true)).unwrap();

    host.run(
        &vm,
        "server.lua",
        "addDebugHook('preFunction', function(source, name, allowed, file, line, a1, a2, a3)
             if name == 'joinTeam' then team_arg = a2 end
             if name == 'logIn' then login_arg = a3 end
         end)
         joinTeam('player', 'blue')
         logIn('player', 'account', 'hunter2')",
    )
    .unwrap();

    assert_eq!(vm.get_global::<String>("team_arg").unwrap(), "<hidden>");
    // The explicit table replaced the built-in one, so logIn is no longer
    // masked.
    assert_eq!(vm.get_global::<String>("login_arg").unwrap(), "hunter2");
}
