use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::interpreter::{DataModel, Program, ProgramConfig};

#[derive(Parser)]
#[command(name = "verdict")]
#[command(about = "Verdict - evaluate rule programs against JSON contexts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a parse tree and run it
    Run {
        /// JSON file holding the generic parse tree
        program: PathBuf,

        /// JSON file used as the host context
        #[arg(short = 'c', long = "context")]
        context: Option<PathBuf>,

        /// Fixed ISO instant for now() and today()
        #[arg(long)]
        clock: Option<String>,

        /// Timezone tag for dates
        #[arg(long)]
        timezone: Option<String>,

        /// Also print the context after the run
        #[arg(long)]
        print_context: bool,
    },

    /// Compile a parse tree without running it
    Check {
        /// JSON file holding the generic parse tree
        program: PathBuf,
    },
}

/// Result of `verdict run`
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub result: JsonValue,
    /// Host context after the run, including script writes
    pub context: JsonValue,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let (clock, timezone) = match &cli.command {
        Commands::Run {
            clock, timezone, ..
        } => (clock.clone(), timezone.clone()),
        Commands::Check { .. } => (None, None),
    };

    // Flags override the config file and VERDICT_* variables
    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .clock(clock)
        .timezone(timezone)
        .build()?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            program,
            context,
            print_context,
            ..
        } => {
            let output = run_program(&program, context.as_deref(), config.program).await?;
            println!("{}", serde_json::to_string_pretty(&output.result)?);
            if print_context {
                println!("{}", serde_json::to_string_pretty(&output.context)?);
            }
        }

        Commands::Check { program } => {
            let size = check_program(&program)?;
            println!("{}: ok ({} instructions)", program.display(), size);
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured filter
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    // Already installed when the CLI runs more than once in one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Compile the program at `path`, returning its instruction count
pub fn check_program(path: &Path) -> Result<usize> {
    let tree = read_json(path)?;
    let program = Program::compile(&tree)
        .with_context(|| format!("Failed to compile {}", path.display()))?;
    Ok(program.root().size())
}

/// Compile and run the program at `path` against an optional context file
pub async fn run_program(
    path: &Path,
    context: Option<&Path>,
    config: ProgramConfig,
) -> Result<RunOutput> {
    let tree = read_json(path)?;
    let program = Program::compile(&tree)
        .with_context(|| format!("Failed to compile {}", path.display()))?
        .with_config(config);

    let document = match context {
        Some(context) => read_json(context)?,
        None => JsonValue::Null,
    };
    let model = DataModel::new(document);

    info!(program = %path.display(), "running");
    let result = program
        .run_with_model(&model)
        .await
        .with_context(|| format!("Failed to run {}", path.display()))?;

    Ok(RunOutput {
        result: result.to_native(),
        context: model.snapshot(),
    })
}
