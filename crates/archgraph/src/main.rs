use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use archgraph_core::config::{Config, CONFIG_FILE};
use archgraph_core::extractor::{ImportExtractor, TextImportScanner};
use archgraph_core::metrics::AnalysisResult;
use archgraph_core::pipeline::ArchitectureAnalyzer;
use archgraph_core::types::Severity;

use archgraph_report::{json, text};
use archgraph_typescript::TypeScriptExtractor;

#[derive(Parser)]
#[command(name = "archgraph")]
#[command(about = "Build module dependency graphs and detect structural problems")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtractorKind {
    /// tree-sitter based scan
    Syntax,
    /// Regex based scan
    Text,
}

#[derive(clap::Args)]
struct AnalysisArgs {
    /// Path to the workspace root
    path: PathBuf,
    /// Config file path (defaults to .archgraph.toml in the workspace or an ancestor)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Extract every file even when incremental mode is enabled
    #[arg(long)]
    full: bool,
    /// Import extractor to use
    #[arg(long, value_enum, default_value = "syntax")]
    extractor: ExtractorKind,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workspace and print a full report
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        #[command(flatten)]
        args: AnalysisArgs,
        /// Minimum severity to cause failure
        #[arg(long, default_value = "high")]
        fail_on: String,
        /// Fail when the architecture score is below this value
        #[arg(long)]
        min_score: Option<f64>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Analyze and write the dependency graph as DOT or Mermaid (.mmd)
    Graph {
        #[command(flatten)]
        args: AnalysisArgs,
        /// Output file; `.mmd` or `.mermaid` selects Mermaid
        #[arg(short, long)]
        output: PathBuf,
        /// Maximum number of modules to draw
        #[arg(long)]
        max_nodes: Option<usize>,
    },
    /// Create a default .archgraph.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            args,
            format,
            compact,
        } => cmd_analyze(&args, format, compact),
        Commands::Check {
            args,
            fail_on,
            min_score,
            format,
        } => cmd_check(&args, &fail_on, min_score, format),
        Commands::Graph {
            args,
            output,
            max_nodes,
        } => cmd_graph(&args, &output, max_nodes),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "Error:".red().bold());
        process::exit(2);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_analyze(args: &AnalysisArgs, format: OutputFormat, compact: bool) -> Result<()> {
    let config = load_config(&args.path, args.config.as_deref())?;
    let result = run_analysis(args, config)?.1;
    match format {
        OutputFormat::Text => print!("{}", text::format_report(&result)),
        OutputFormat::Json => println!("{}", json::format_report(&result, compact)?),
    }
    Ok(())
}

fn cmd_check(
    args: &AnalysisArgs,
    fail_on_str: &str,
    min_score: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let fail_on: Severity = fail_on_str.parse()?;
    let config = load_config(&args.path, args.config.as_deref())?;
    let result = run_analysis(args, config)?.1;
    let passed = match format {
        OutputFormat::Text => {
            let (report, passed) = text::format_check(&result, fail_on, min_score);
            print!("{report}");
            passed
        }
        OutputFormat::Json => {
            let (report, passed) = json::format_check(&result, fail_on, min_score, false)?;
            println!("{report}");
            passed
        }
    };
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_graph(args: &AnalysisArgs, output: &Path, max_nodes: Option<usize>) -> Result<()> {
    let mut config = load_config(&args.path, args.config.as_deref())?;
    if let Some(max) = max_nodes {
        config.visualization_max_nodes = max;
    }
    let (analyzer, result) = run_analysis(args, config)?;
    analyzer.export_visualization(output)?;
    println!(
        "Wrote {} ({} modules, {} dependencies)",
        output.display(),
        result.metrics.total_modules.min(analyzer.config().visualization_max_nodes),
        result.metrics.total_dependencies
    );
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Ok(Config::load(p)?),
        None => Ok(Config::load_or_default(project_path)?),
    }
}

fn build_extractor(kind: ExtractorKind) -> Result<Box<dyn ImportExtractor>> {
    let extractor: Box<dyn ImportExtractor> = match kind {
        ExtractorKind::Syntax => Box::new(
            TypeScriptExtractor::new().context("failed to initialize TypeScript extractor")?,
        ),
        ExtractorKind::Text => Box::new(TextImportScanner::new()),
    };
    Ok(extractor)
}

fn run_analysis(
    args: &AnalysisArgs,
    config: Config,
) -> Result<(ArchitectureAnalyzer, AnalysisResult)> {
    let extractor = build_extractor(args.extractor)?;
    info!(
        path = %args.path.display(),
        extractor = extractor.name(),
        full = args.full,
        "starting analysis"
    );
    let mut analyzer = ArchitectureAnalyzer::new(&args.path, config, extractor)?;
    let result = if args.full {
        analyzer.analyze_full()
    } else {
        analyzer.analyze()
    };
    Ok((analyzer, result))
}
