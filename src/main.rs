use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use cutlist::config::Config;
use cutlist::error::AppError;
use cutlist::media::catalog::HttpCatalog;
use cutlist::spec::EditSpecification;
use cutlist::timeline::parser;

/// Build an OpenTimelineIO timeline from a JSON cut list.
#[derive(Parser, Debug)]
#[command(name = "cutlist", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Edit specification JSON file
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Edit specification as an inline JSON string
    #[arg(long, value_name = "JSON")]
    json: Option<String>,

    /// Where to write the timeline
    #[arg(long, short, value_name = "PATH", default_value = "output.otio")]
    output: PathBuf,

    /// Directory for downloaded source media
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Config file (defaults to the per-user cutlist/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Clips to resolve concurrently
    #[arg(long, short)]
    jobs: Option<usize>,

    /// Suffix clip names with their position instead of sharing the edit name
    #[arg(long)]
    unique_clip_names: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tracks and clips of an .otio file as JSON
    Inspect {
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::NoSpecification) => {
            if let Err(e) = Cli::command().print_help() {
                log::debug!("Could not print help: {e}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            if let Ok(json) = serde_json::to_string(&e) {
                println!("{json}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(Command::Inspect { path }) = &cli.command {
        let timeline = parser::parse_otio_file(path)?;
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    let spec = read_spec(&cli)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    if cli.unique_clip_names {
        config.unique_clip_names = true;
    }
    config.check()?;

    let catalog = HttpCatalog::new(&config)?;
    let report = cutlist::build_timeline(&spec, catalog, &config, &cli.output)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// `--json` wins over `--file`; with neither, stdin is read unless it is a
/// terminal.
fn read_spec(cli: &Cli) -> Result<EditSpecification, AppError> {
    if let Some(json) = &cli.json {
        return Ok(EditSpecification::from_json(json)?);
    }
    if let Some(path) = &cli.file {
        return Ok(EditSpecification::from_file(path)?);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(AppError::NoSpecification);
    }
    Ok(EditSpecification::from_reader(stdin.lock())?)
}
