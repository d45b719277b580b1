#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use vcide_engine::{Script, ScriptedEngine};
use vcide_session::{Actions, AppState, Catalog, Driver, ExampleName, SessionConfig};

mod host;
mod protocol;

use host::EventSink;
use protocol::SessionEvent;

#[derive(Parser, Debug)]
#[command(name = "vcide", version, about = "Interactive verification session over a JSON line protocol")]
struct Cli {
    /// Example to load first. Overrides the config file.
    #[arg(long)]
    example: Option<String>,

    /// Directory of `*.js` examples replacing the built-in catalog.
    #[arg(long = "examples-dir")]
    examples_dir: Option<PathBuf>,

    /// Engine script (TOML) describing verification outcomes.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Session configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured filter.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn init_tracing(filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(name) = cli.example {
        config.initial_example = Some(ExampleName::new(name));
    }
    if cli.examples_dir.is_some() {
        config.examples_dir = cli.examples_dir;
    }
    if cli.script.is_some() {
        config.script = cli.script;
    }
    init_tracing(&config.log_filter, cli.verbose);

    let catalog = match &config.examples_dir {
        Some(dir) => Catalog::from_dir(dir)?,
        None => Catalog::builtin(),
    };
    let engine = match &config.script {
        Some(path) => ScriptedEngine::from_script(Script::from_file(path)?),
        None => {
            tracing::warn!("no engine script given; every obligation will be reported unknown");
            ScriptedEngine::new()
        }
    };

    let initial = catalog.initial(config.initial_example.as_ref())?.clone();
    let state = AppState {
        show_source_annotations: config.show_source_annotations,
        ..AppState::initial(&initial)
    };
    let actions = Actions::new(Arc::new(engine), Arc::new(catalog), config.verify_delay());

    let sink = EventSink::new(std::io::stdout());
    sink.emit(&SessionEvent::hello(actions.catalog()));
    let mut driver = Driver::new(state);
    host::attach(&mut driver, sink.clone());
    tracing::info!(example = %initial.name, "session started");
    driver.dispatch(actions.select_example(&initial.name)?);

    let driver = host::run_session(driver, &actions, BufReader::new(tokio::io::stdin()), &sink).await?;
    tracing::info!(vcs = driver.state().vcs.len(), "session closed");
    Ok(())
}
