mod args;

use clap::Parser;
use qrouter_core::{
    ChangeOptions, ContextSnapshot, MemoryHistory, Navigation, ParamMap, QueryRouter,
    RouterConfig,
};
use serde::Serialize;
use tracing::{error, info};

use args::{to_update, Args, Command};

/// What one run prints, as JSON.
#[derive(Serialize)]
struct Report {
    location: String,
    /// `push` or `replace` when the command navigated
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'static str>,
    params: ParamMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    translated: Option<ParamMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<ContextSnapshot>,
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .with_target(false)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn load_config(args: &Args) -> RouterConfig {
    let Some(path) = &args.config else {
        return RouterConfig::default();
    };
    RouterConfig::load(path).unwrap_or_else(|e| {
        error!("Failed to load config {}: {e}", path.display());
        std::process::exit(1);
    })
}

fn run(router: &QueryRouter<&MemoryHistory>, args: &Args) -> Report {
    let method = args.history_method();
    let mut translated = None;
    let mut context = None;

    let navigation: Option<Navigation> = match &args.command {
        Command::Parse => None,
        Command::Translate => {
            translated = Some(router.translate());
            None
        }
        Command::Change { pathname, changes } => {
            let options = ChangeOptions {
                pathname: pathname.clone(),
                history_method: method,
            };
            Some(router.change(to_update(changes), &options))
        }
        Command::Add { key, value } => router.add(key, value),
        Command::Remove { key, value } => router.remove(key, value),
        Command::Clear => Some(router.clear()),
        Command::Context { target } => {
            context = Some(router.context(&target.context_config(method)).snapshot());
            None
        }
        Command::Create { target, extra } => {
            let config = target.context_config(method);
            let navigation = router.change_to_creation(to_update(extra), &config);
            context = Some(router.context(&config).snapshot());
            Some(navigation)
        }
        Command::Modify { target, extra } => {
            let config = target.context_config(method);
            let navigation = router.change_to_modification(to_update(extra), &config);
            context = Some(router.context(&config).snapshot());
            Some(navigation)
        }
        Command::ReadOnly { target, extra } => {
            let config = target.context_config(method);
            let navigation = router.change_to_read_only(to_update(extra), &config);
            context = Some(router.context(&config).snapshot());
            navigation
        }
    };

    Report {
        location: router.location().path(),
        method: navigation.map(|n| n.method.as_str()),
        params: router.parse().as_ref().clone(),
        translated,
        context,
    }
}

fn main() {
    configure_logging();
    let args = Args::parse();

    let config = load_config(&args);
    let history = MemoryHistory::new(&args.location);
    let router = QueryRouter::new(config, &history).unwrap_or_else(|e| {
        error!("Invalid router config: {e}");
        std::process::exit(1);
    });

    info!("Starting from {}", router.location());
    let report = run(&router, &args);

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}
