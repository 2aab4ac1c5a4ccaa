use clap::CommandFactory;
use clipcap::backend::{self, ExecutionPlan};
use clipcap::cli::{CliArgs, CliSources, parse_cli};
use clipcap::settings::{ConfigError, resolve_settings};
use clipcap_media::{Configuration, MediaError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), MediaError> {
    let (cli_args, cli_sources): (CliArgs, CliSources) = parse_cli();
    init_tracing(cli_args.verbose);

    match prepare_execution_plan(cli_args, &cli_sources)? {
        Some(plan) => backend::run(plan).await,
        None => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "clipcap=debug,clipcap_media=debug"
    } else {
        "clipcap=info,clipcap_media=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn prepare_execution_plan(
    cli_args: CliArgs,
    cli_sources: &CliSources,
) -> Result<Option<ExecutionPlan>, MediaError> {
    if cli_args.list_backends {
        backend::display_available_backends();
        return Ok(None);
    }

    let input = match cli_args.input.clone() {
        Some(input) => input,
        None => {
            usage();
            return Ok(None);
        }
    };

    let resolved = resolve_settings(&cli_args, cli_sources).map_err(map_config_error)?;
    if let Some(path) = resolved.config_path.as_deref() {
        debug!(path = %path.display(), "loaded configuration");
    }
    let settings = resolved.settings;

    let mut config = Configuration::from_env()?;
    if let Some(name) = settings.media.backend.as_deref() {
        config.backend = backend::parse_backend(name)?;
    }
    if let Some(duration) = settings.media.duration {
        config.duration = duration;
    }

    Ok(Some(ExecutionPlan {
        config,
        settings,
        input,
        start: cli_args.start,
        end: cli_args.end,
        container_width: cli_args.container_width,
        output: cli_args.output,
        play: cli_args.play,
    }))
}

fn usage() {
    let mut command = CliArgs::command();
    command.print_help().ok();
    println!();
    backend::display_available_backends();
}

fn map_config_error(err: ConfigError) -> MediaError {
    MediaError::configuration(err.to_string())
}
