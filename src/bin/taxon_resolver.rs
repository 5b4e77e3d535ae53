use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use taxon_resolver::app::{App, LookupColumnRequest, ResolveRequest};
use taxon_resolver::checklist::ChecklistHttpClient;
use taxon_resolver::config::ConfigLoader;
use taxon_resolver::domain::Rank;
use taxon_resolver::error::ResolverError;
use taxon_resolver::matcher::KnmsHttpClient;
use taxon_resolver::output::JsonOutput;
use taxon_resolver::store::Store;

#[derive(Parser)]
#[command(name = "taxon-resolver")]
#[command(about = "Resolve free-text plant names to accepted taxa of a world checklist")]
#[command(version, author)]
struct Cli {
    /// JSON configuration file (default: ./taxon-resolver.json if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve a column of names and append the accepted taxon columns")]
    Resolve(ResolveArgs),
    #[command(about = "Canonicalize checklist ids")]
    Lookup(LookupArgs),
    #[command(about = "Canonicalize a column of checklist ids")]
    LookupColumn(LookupColumnArgs),
    #[command(about = "Manage the local checklist copy")]
    Checklist(ChecklistArgs),
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(long)]
    input: Utf8PathBuf,

    #[arg(long)]
    column: String,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    #[arg(long = "family")]
    families: Vec<String>,

    #[arg(long = "rank")]
    ranks: Vec<Rank>,

    #[arg(long)]
    drop_unmatched: bool,
}

#[derive(Args)]
struct LookupArgs {
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Args)]
struct LookupColumnArgs {
    #[arg(long)]
    input: Utf8PathBuf,

    #[arg(long)]
    column: String,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ChecklistArgs {
    #[command(subcommand)]
    command: ChecklistCommand,
}

#[derive(Subcommand)]
enum ChecklistCommand {
    #[command(about = "Download the checklist archive")]
    Fetch {
        #[arg(long)]
        force: bool,
    },
    #[command(about = "Show the local checklist and its provenance")]
    Info,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ResolverError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ResolverError) -> u8 {
    match error {
        ResolverError::InvalidRank(_)
        | ResolverError::InvalidStatus(_)
        | ResolverError::InvalidStageOrder(_)
        | ResolverError::ConfigRead(_)
        | ResolverError::ConfigParse(_)
        | ResolverError::MissingColumn { .. }
        | ResolverError::TableRead(_) => 2,
        ResolverError::ChecklistHttp(_)
        | ResolverError::ChecklistStatus { .. }
        | ResolverError::MatcherHttp(_)
        | ResolverError::MatcherStatus { .. }
        | ResolverError::MatcherResponse(_) => 3,
        error if error.is_integrity_violation() => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = Store::from_config(&config)?;
    let downloader = ChecklistHttpClient::new()?;
    let matcher = KnmsHttpClient::new(&config.matcher)?;
    let app = App::new(store, config, downloader, matcher);

    match cli.command {
        Commands::Resolve(args) => {
            let result = app.resolve(&ResolveRequest {
                input: args.input,
                column: args.column,
                output: args.output,
                families: args.families,
                ranks: args.ranks,
                drop_unmatched: args.drop_unmatched,
            })?;
            JsonOutput::print_resolve(&result).into_diagnostic()?;
        }
        Commands::Lookup(args) => {
            let result = app.lookup(&args.ids)?;
            JsonOutput::print_lookup(&result).into_diagnostic()?;
        }
        Commands::LookupColumn(args) => {
            let result = app.lookup_column(&LookupColumnRequest {
                input: args.input,
                column: args.column,
                output: args.output,
            })?;
            JsonOutput::print_lookup_column(&result).into_diagnostic()?;
        }
        Commands::Checklist(args) => match args.command {
            ChecklistCommand::Fetch { force } => {
                let result = app.fetch_checklist(force)?;
                JsonOutput::print_fetch(&result).into_diagnostic()?;
            }
            ChecklistCommand::Info => {
                let result = app.checklist_info()?;
                JsonOutput::print_info(&result).into_diagnostic()?;
            }
        },
    }
    Ok(())
}
