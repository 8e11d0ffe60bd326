#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use report_layout::render_cmd;

#[derive(Parser, Debug)]
#[command(name = "report-layout")]
#[command(about = "Render recorded test-execution logs as HTML report tables", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set REPORT_LAYOUT_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a JSONL event stream into an HTML report
    Render {
        /// Path to recorded events (events.jsonl)
        #[arg(long)]
        input: std::path::PathBuf,
        /// Path of the HTML report to write
        #[arg(long)]
        output: std::path::PathBuf,
        /// Layout configuration file (TOML)
        #[arg(long)]
        config: Option<std::path::PathBuf>,
        /// Conversion pattern override (e.g. %date{HH:mm:ss.SSS}%level%message)
        #[arg(long)]
        pattern: Option<String>,
        /// Report title override
        #[arg(long)]
        title: Option<String>,
        /// External stylesheet URL to link instead of the embedded styles
        #[arg(long)]
        stylesheet: Option<String>,
        /// Break the table after this many message rows
        #[arg(long)]
        row_limit: Option<usize>,
        /// Treat events at this level as step rows (e.g. error)
        #[arg(long)]
        step_level: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("REPORT_LAYOUT_LOG").unwrap_or_else(|_| {
        if verbose { "report_layout=debug".to_string() } else { "report_layout=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            input,
            output,
            config,
            pattern,
            title,
            stylesheet,
            row_limit,
            step_level,
        } => render_cmd::run(
            input, output, config, pattern, title, stylesheet, row_limit, step_level,
        ),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
