#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use shelf_core::Backend;
use std::env;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "shelf",
    author,
    version,
    about = "shelf: retail product catalog with GTIN integrity checks",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Storage backend for this invocation (overrides SHELF_BACKEND and config).
    #[arg(long, global = true, value_name = "local|sqlite")]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags and environment.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a catalog",
        long_about = "Create .shelf/ in the current directory with a default config and an empty store.",
        after_help = "EXAMPLES:\n    # Initialize with the default local backend\n    shelf init\n\n    # Use SQLite and create the starter categories\n    shelf init --backend sqlite --seed\n\n    # Emit machine-readable output\n    shelf init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Catalog",
        about = "Manage categories",
        long_about = "Create, rename, delete, list and show product categories.",
        after_help = "EXAMPLES:\n    # Add a category\n    shelf category add Drinks --description \"Cold drinks\"\n\n    # Rename it\n    shelf category update <ID> --name Beverages\n\n    # List categories with product counts\n    shelf category list --json"
    )]
    Category(cmd::category::CategoryArgs),

    #[command(
        next_help_heading = "Catalog",
        about = "Manage products",
        long_about = "Create, update, delete, list, show and look up products by GTIN.",
        after_help = "EXAMPLES:\n    # Add a product (category by id or exact name)\n    shelf product add --name Water --gtin 4006381333931 --category Drinks --price 0.99 --stock 40\n\n    # Change the stock count\n    shelf product update <ID> --stock 12\n\n    # Look up by GTIN, separators allowed\n    shelf product find 400-638-133-393-1"
    )]
    Product(cmd::product::ProductArgs),

    #[command(
        next_help_heading = "Catalog",
        about = "Validate or format a GTIN",
        long_about = "Check a GTIN-8/12/13/14 against the GS1 check digit, or print it in grouped form.",
        after_help = "EXAMPLES:\n    # Validate a code\n    shelf gtin validate 4006381333931\n\n    # Print the grouped display form\n    shelf gtin format 4006381333931"
    )]
    Gtin(cmd::gtin::GtinArgs),

    #[command(
        next_help_heading = "Reporting",
        about = "Show catalog statistics",
        long_about = "Summarize product counts, stock value, low and out-of-stock products, and category usage.",
        after_help = "EXAMPLES:\n    # Show statistics\n    shelf stats\n\n    # Emit machine-readable output\n    shelf stats --json"
    )]
    Stats,

    #[command(
        next_help_heading = "Backup",
        about = "Export the catalog to a snapshot",
        long_about = "Write the full catalog as a JSON snapshot to a file, or to stdout when no file is given.",
        after_help = "EXAMPLES:\n    # Write a backup file\n    shelf export --output backup.json\n\n    # Stream the snapshot to stdout\n    shelf export > backup.json"
    )]
    Export(cmd::snapshot::ExportArgs),

    #[command(
        next_help_heading = "Backup",
        about = "Replace the catalog with a snapshot",
        long_about = "Clear the catalog and restore every category and product from a snapshot file, keeping ids and timestamps.",
        after_help = "EXAMPLES:\n    # Restore from a backup\n    shelf import backup.json\n\n    # Move a catalog into SQLite\n    shelf import backup.json --backend sqlite"
    )]
    Import(cmd::snapshot::ImportArgs),

    #[command(
        next_help_heading = "Backup",
        about = "Delete every product and category",
        long_about = "Delete all products, then all categories. Requires --force.",
        after_help = "EXAMPLES:\n    # Wipe the catalog\n    shelf clear --force"
    )]
    Clear(cmd::snapshot::ClearArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        long_about = "Print a shell completion script for shelf to stdout.",
        after_help = "EXAMPLES:\n    # Bash\n    shelf completions bash > ~/.local/share/bash-completion/completions/shelf"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SHELF_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "shelf=debug,info"
        } else {
            "shelf=info,warn"
        })
    });

    let format = env::var("SHELF_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn dispatch(cli: Cli, output: OutputMode, cwd: &Path) -> anyhow::Result<()> {
    let backend = cli.backend;
    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, backend, output, cwd),
        Commands::Category(args) => cmd::category::run_category(&args, backend, output, cwd),
        Commands::Product(args) => cmd::product::run_product(&args, backend, output, cwd),
        Commands::Gtin(args) => cmd::gtin::run_gtin(&args, output),
        Commands::Stats => cmd::stats::run_stats(backend, output, cwd),
        Commands::Export(args) => cmd::snapshot::run_export(&args, backend, output, cwd),
        Commands::Import(args) => cmd::snapshot::run_import(&args, backend, output, cwd),
        Commands::Clear(args) => cmd::snapshot::run_clear(&args, backend, output, cwd),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(backend = ?cli.backend, json = cli.json, "starting");

    let cwd = env::current_dir()?;
    let output = cli.output_mode();

    if let Err(err) = dispatch(cli, output, &cwd) {
        debug!(error = ?err, "command failed");
        render_error(output, &CliError::from(&err))?;
        std::process::exit(1);
    }
    Ok(())
}
