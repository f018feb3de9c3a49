//! Argument parsing and command dispatch.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use datanex_api_models::{CleanStrategy, DedupMethod, KeepPolicy, ScrapeMethod};
use datanex_client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use datanex_telemetry::{LogFormat, LoggingConfig, command_span, init_logging, log_format_from_label};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, debug};
use url::Url;

use crate::client::{AppContext, CliResult, ContextSettings};
use crate::commands::chain::{
    handle_chain_address, handle_chain_block, handle_chain_contract, handle_chain_gas,
    handle_chain_tx,
};
use crate::commands::files::{
    handle_files_delete, handle_files_list, handle_files_show, handle_upload,
};
use crate::commands::jobs::{
    handle_analyze_clean, handle_analyze_dedup, handle_analyze_full, handle_task_status,
};
use crate::commands::scrape::{
    handle_scrape_crawl, handle_scrape_multi, handle_scrape_tables, handle_scrape_url,
};
use crate::commands::session::{handle_login, handle_logout};
use crate::commands::system::{handle_health, handle_stats};

const DEFAULT_CLI_LOG_LEVEL: &str = "warn";
const TOKEN_PATH: [&str; 3] = [".config", "datanex", "token"];

/// Parses CLI arguments, executes the requested command, and reports failures
/// on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: log_format_from_label(cli.log_format.as_deref()).unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let span = command_span(command_label(&cli.command));
    match dispatch(cli).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let settings = ContextSettings {
        api_url: cli.api_url,
        timeout: Duration::from_secs(cli.timeout),
        token_file: cli.token_file.unwrap_or_else(default_token_file),
        output: cli.output,
        assume_yes: assume_yes(&cli.command),
    };
    debug!(api_url = %settings.api_url, token_file = %settings.token_file.display(), "dispatching command");
    let ctx = AppContext::build(&settings)?;

    let result = match cli.command {
        Command::Login(args) => handle_login(&ctx, args),
        Command::Logout => handle_logout(&ctx),
        Command::Upload(args) => handle_upload(&ctx, args).await,
        Command::Files(files) => match files {
            FilesCommand::List(args) => handle_files_list(&ctx, args).await,
            FilesCommand::Show(args) => handle_files_show(&ctx, args).await,
            FilesCommand::Delete(args) => handle_files_delete(&ctx, args).await,
        },
        Command::Analyze(analyze) => match analyze {
            AnalyzeCommand::Full(args) => handle_analyze_full(&ctx, args).await,
            AnalyzeCommand::Clean(args) => handle_analyze_clean(&ctx, args).await,
            AnalyzeCommand::Dedup(args) => handle_analyze_dedup(&ctx, args).await,
        },
        Command::Task(TaskCommand::Status(args)) => handle_task_status(&ctx, args).await,
        Command::Scrape(scrape) => match scrape {
            ScrapeCommand::Url(args) => handle_scrape_url(&ctx, args).await,
            ScrapeCommand::Multi(args) => handle_scrape_multi(&ctx, args).await,
            ScrapeCommand::Crawl(args) => handle_scrape_crawl(&ctx, args).await,
            ScrapeCommand::Tables(args) => handle_scrape_tables(&ctx, args).await,
        },
        Command::Chain(chain) => match chain {
            ChainCommand::Address(args) => handle_chain_address(&ctx, args).await,
            ChainCommand::Tx(args) => handle_chain_tx(&ctx, args).await,
            ChainCommand::Block(args) => handle_chain_block(&ctx, args).await,
            ChainCommand::Gas => handle_chain_gas(&ctx).await,
            ChainCommand::Contract(args) => handle_chain_contract(&ctx, args).await,
        },
        Command::Stats => handle_stats(&ctx).await,
        Command::Health => handle_health(&ctx).await,
    };
    if result.is_ok() {
        ctx.print_notice();
    }
    result
}

#[derive(Parser)]
#[command(name = "datanex", about = "Datanex analysis console", version)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "DATANEX_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    api_url: Url,
    #[arg(
        long,
        global = true,
        env = "DATANEX_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long,
        global = true,
        env = "DATANEX_TOKEN_FILE",
        help = "Bearer token location [default: ~/.config/datanex/token]"
    )]
    token_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "DATANEX_LOG_LEVEL",
        default_value = DEFAULT_CLI_LOG_LEVEL
    )]
    log_level: String,
    #[arg(long, global = true, env = "DATANEX_LOG_FORMAT", help = "pretty or json")]
    log_format: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Store a bearer token for later commands.
    Login(LoginArgs),
    /// Forget the stored bearer token.
    Logout,
    /// Upload a file and request its analysis.
    Upload(UploadArgs),
    /// Uploaded file records.
    #[command(subcommand)]
    Files(FilesCommand),
    /// Analysis and data-quality jobs.
    #[command(subcommand)]
    Analyze(AnalyzeCommand),
    /// Background tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Web scraping.
    #[command(subcommand)]
    Scrape(ScrapeCommand),
    /// Blockchain lookups.
    #[command(subcommand)]
    Chain(ChainCommand),
    /// Service-wide counters.
    Stats,
    /// Service liveness.
    Health,
}

#[derive(Subcommand)]
pub(crate) enum FilesCommand {
    /// List uploaded files.
    List(FilesListArgs),
    /// Show one file record.
    Show(FileIdArgs),
    /// Delete a file.
    Delete(FileDeleteArgs),
}

#[derive(Subcommand)]
pub(crate) enum AnalyzeCommand {
    /// Full analysis.
    Full(FileIdArgs),
    /// Missing-value cleaning.
    Clean(CleanArgs),
    /// Duplicate removal.
    Dedup(DedupArgs),
}

#[derive(Subcommand)]
pub(crate) enum TaskCommand {
    /// Background task state.
    Status(TaskStatusArgs),
}

#[derive(Subcommand)]
pub(crate) enum ScrapeCommand {
    /// Scrape one page.
    Url(ScrapeUrlArgs),
    /// Scrape several pages.
    Multi(ScrapeMultiArgs),
    /// Crawl a site.
    Crawl(CrawlArgs),
    /// Extract HTML tables from a page.
    Tables(TablesArgs),
}

#[derive(Subcommand)]
pub(crate) enum ChainCommand {
    /// Analyse an account address.
    Address(AddressArgs),
    /// Look up a transaction.
    Tx(TxArgs),
    /// Look up a block.
    Block(BlockArgs),
    /// Current gas prices.
    Gas,
    /// Analyse a contract.
    Contract(AddressArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct LoginArgs {
    #[arg(long, env = "DATANEX_TOKEN", hide_env_values = true)]
    pub(crate) token: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct UploadArgs {
    pub(crate) path: PathBuf,
    #[arg(long, help = "Skip the analysis request after upload")]
    pub(crate) no_analyze: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FilesListArgs {
    #[arg(long, default_value_t = 0)]
    pub(crate) skip: u32,
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) limit: u32,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FileIdArgs {
    pub(crate) file_id: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FileDeleteArgs {
    pub(crate) file_id: String,
    #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CleanArgs {
    pub(crate) file_id: String,
    #[arg(long, value_parser = parse_choice::<CleanStrategy>, default_value = "drop")]
    pub(crate) strategy: CleanStrategy,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DedupArgs {
    pub(crate) file_id: String,
    #[arg(long, value_parser = parse_choice::<DedupMethod>, default_value = "hybrid")]
    pub(crate) method: DedupMethod,
    #[arg(long, value_parser = parse_choice::<KeepPolicy>, default_value = "first")]
    pub(crate) keep: KeepPolicy,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TaskStatusArgs {
    pub(crate) task_id: String,
    #[arg(long, help = "Poll until the task succeeds or fails")]
    pub(crate) wait: bool,
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) interval: u64,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ScrapeUrlArgs {
    pub(crate) url: String,
    #[arg(long, value_parser = parse_choice::<ScrapeMethod>, default_value = "requests")]
    pub(crate) method: ScrapeMethod,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ScrapeMultiArgs {
    pub(crate) urls: Vec<String>,
    #[arg(long, help = "Read additional URLs from a file, one per line")]
    pub(crate) from_file: Option<PathBuf>,
    #[arg(long, value_parser = parse_choice::<ScrapeMethod>, default_value = "requests")]
    pub(crate) method: ScrapeMethod,
    #[arg(long, default_value_t = 5)]
    pub(crate) max_concurrent: u32,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CrawlArgs {
    pub(crate) start_url: String,
    #[arg(long, default_value_t = 2)]
    pub(crate) max_depth: u32,
    #[arg(long, default_value_t = 100)]
    pub(crate) max_pages: u32,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TablesArgs {
    pub(crate) url: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct AddressArgs {
    pub(crate) address: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct TxArgs {
    pub(crate) tx_hash: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BlockArgs {
    pub(crate) block_number: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Upload(_) => "upload",
        Command::Files(FilesCommand::List(_)) => "files_list",
        Command::Files(FilesCommand::Show(_)) => "files_show",
        Command::Files(FilesCommand::Delete(_)) => "files_delete",
        Command::Analyze(AnalyzeCommand::Full(_)) => "analyze_full",
        Command::Analyze(AnalyzeCommand::Clean(_)) => "analyze_clean",
        Command::Analyze(AnalyzeCommand::Dedup(_)) => "analyze_dedup",
        Command::Task(TaskCommand::Status(_)) => "task_status",
        Command::Scrape(ScrapeCommand::Url(_)) => "scrape_url",
        Command::Scrape(ScrapeCommand::Multi(_)) => "scrape_multi",
        Command::Scrape(ScrapeCommand::Crawl(_)) => "scrape_crawl",
        Command::Scrape(ScrapeCommand::Tables(_)) => "scrape_tables",
        Command::Chain(ChainCommand::Address(_)) => "chain_address",
        Command::Chain(ChainCommand::Tx(_)) => "chain_tx",
        Command::Chain(ChainCommand::Block(_)) => "chain_block",
        Command::Chain(ChainCommand::Gas) => "chain_gas",
        Command::Chain(ChainCommand::Contract(_)) => "chain_contract",
        Command::Stats => "stats",
        Command::Health => "health",
    }
}

const fn assume_yes(command: &Command) -> bool {
    matches!(command, Command::Files(FilesCommand::Delete(FileDeleteArgs { yes: true, .. })))
}

fn default_token_file() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || PathBuf::from("datanex-token"),
        |home| TOKEN_PATH.iter().fold(PathBuf::from(home), |path, part| path.join(part)),
    )
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Parse a wire label (e.g. `fuzzy`) into the matching request enum.
fn parse_choice<T: DeserializeOwned>(input: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(input.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unsupported value '{input}'"))
}
