//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the final answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text answer
    Text,
    /// JSON object with the answer and run statistics
    Json,
}

impl From<OutputFormat> for conductor_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => conductor_domain::OutputFormat::Text,
            OutputFormat::Json => conductor_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Tool-calling agent orchestrator")]
#[command(long_about = r#"
Conductor answers a question with a language model that can call tools:
local document tools, deployment-backed generators and remote tool servers.

Each turn runs in rounds. The model either answers or requests tool calls;
the calls run concurrently and their results are fed back until the model
answers or the round limit is reached.

Configuration is loaded from (lowest to highest priority):
1. ~/.config/conductor/config.toml      Global config
2. ./conductor.toml                     Project-level config
3. --config <path>                      Explicit config file
4. CONDUCTOR_SECTION__KEY               Environment variables

Example:
  conductor "Summarize the attached report" --file ./report.txt
  conductor --chat --max-depth 5
"#)]
pub struct Cli {
    /// The question to ask (not required in chat mode)
    pub question: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Attach a file path or URL to the question (can be specified multiple times)
    #[arg(short, long = "file", value_name = "REF")]
    pub files: Vec<String>,

    /// Maximum model round trips per turn
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Output format (overrides [output] format)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
