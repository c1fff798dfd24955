use tracing::info;

use scripthook::{Config, ResourceId, ScriptHost};

fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = scripthook::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        scripthook::logging::init_console_only(&config.logging.level);
    }

    info!("scripthook - debug hook instrumentation demo");

    if let Err(e) = run_demo(&config) {
        eprintln!("Demo failed: {e}");
        std::process::exit(1);
    }
}

fn run_demo(config: &Config) -> scripthook::Result<()> {
    let host = ScriptHost::with_config(config);
    let vm = host.create_vm("demo", ResourceId(1))?;

    host.register_native(&vm, "logIn", |_, _| Ok(true))?;

    host.run(
        &vm,
        "demo.lua",
        r#"
            addDebugHook('preFunction', function(source, name, allowed, file, line, ...)
                print(('[hook] %s at %s:%d args:'):format(name, file, line), ...)
            end)
            logIn('player', 'account', 'hunter2')
        "#,
    )?;

    let id = vm.id();
    host.teardown_vm(id);
    info!("demo finished");
    Ok(())
}
