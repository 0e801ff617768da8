//! Top-level CLI parsing and command execution.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::{
    CompletionSettings, Credentials, DEFAULT_ENV_FILE, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE,
};
use crate::entities::trial::{DEFAULT_TRIAL_LIMIT, SearchQuery, clamp_limit};
use crate::render::text::{PresenterMode, connection_banner, format_block};
use crate::sources::clinicaltrials::ClinicalTrialsClient;
use crate::sources::completion::{ChatCompletionsClient, CompletionClient};

pub mod prompt;
pub mod session;

const PING_PROMPT: &str = "say 'Hello!' as is";
const PING_MAX_TOKENS: u32 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "trialscout",
    about = "Find recruiting clinical trials on ClinicalTrials.gov and get a patient-friendly summary",
    version,
    after_help = "Running without a subcommand starts the interactive `find` assistant.\n\
Results are informational only and are not medical advice."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Dotenv-style file consulted for LITELLM_API_BASE / LITELLM_API_KEY when unset
    #[arg(long, global = true, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive assistant: ask a few questions, search, summarize, save
    #[command(after_help = "\
EXAMPLES:
  trialscout find
  trialscout find --condition \"type 2 diabetes\" --age 61 --location Texas --count 4
  trialscout find --mode inline --output reports/latest.txt")]
    Find(FindArgs),
    /// Search recruiting trials and print the listing (no language model involved)
    #[command(after_help = "\
EXAMPLES:
  trialscout search melanoma
  trialscout search \"breast cancer\" --location California --limit 3")]
    Search {
        /// Condition or disease to search for
        condition: String,
        /// State or country used to float nearby trials to the top
        #[arg(short, long)]
        location: Option<String>,
        /// Number of trials to show (clamped to 1-10)
        #[arg(short = 'n', long, default_value_t = DEFAULT_TRIAL_LIMIT as i64, allow_negative_numbers = true)]
        limit: i64,
        /// Listing style (inline truncates summaries to 400 characters)
        #[arg(long, value_enum, default_value_t = PresenterMode::Separate)]
        mode: PresenterMode,
    },
    /// Show the registry API version and data snapshot
    Registry,
    /// Check that the completion endpoint answers
    PingLlm {
        /// Model name passed to the completion endpoint
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
    /// Show version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    /// Condition to search for (asked interactively when omitted)
    #[arg(short, long)]
    pub condition: Option<String>,
    /// Patient age (asked interactively when omitted)
    #[arg(short, long)]
    pub age: Option<String>,
    /// State or country (asked interactively when omitted)
    #[arg(short, long)]
    pub location: Option<String>,
    /// Number of trials, 1-10 (asked interactively when omitted)
    #[arg(short = 'n', long, allow_hyphen_values = true)]
    pub count: Option<String>,
    /// How the summary and the listing are presented
    #[arg(long, value_enum, default_value_t = PresenterMode::Separate)]
    pub mode: PresenterMode,
    /// File the query and trial listing are written to
    #[arg(short, long, default_value = session::DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,
    #[command(flatten)]
    pub model: ModelArgs,
}

impl Default for FindArgs {
    fn default() -> Self {
        Self {
            condition: None,
            age: None,
            location: None,
            count: None,
            mode: PresenterMode::Separate,
            output: PathBuf::from(session::DEFAULT_OUTPUT_PATH),
            model: ModelArgs::default(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model name passed to the completion endpoint
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
    /// Maximum tokens in the generated summary
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}

impl Default for ModelArgs {
    fn default() -> Self {
        let defaults = CompletionSettings::default();
        Self {
            model: defaults.model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }
}

impl From<ModelArgs> for CompletionSettings {
    fn from(args: ModelArgs) -> Self {
        Self {
            model: args.model,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
        }
    }
}

fn version_output() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("TRIALSCOUT_BUILD_GIT_SHA").unwrap_or("unknown");
    let build = option_env!("TRIALSCOUT_BUILD_DATE").unwrap_or("unknown");
    format!("trialscout {version} (git {git}, build {build})")
}

async fn run_find(args: FindArgs, env_file: &std::path::Path) -> anyhow::Result<String> {
    // Credentials are checked before any request leaves the machine.
    let credentials = Credentials::load(env_file)?;
    let registry = ClinicalTrialsClient::new()?;
    let completion = ChatCompletionsClient::new(&credentials, args.model.into())?;
    debug!(registry = registry.base(), model = completion.model(), "clients ready");

    let options = session::SessionOptions {
        answers: session::PresetAnswers {
            condition: args.condition,
            age: args.age,
            location: args.location,
            count: args.count,
        },
        mode: args.mode,
        output_path: args.output,
    };

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    session::run_session(&mut input, &mut out, &registry, &completion, &options).await?;
    Ok(String::new())
}

/// Executes one parsed CLI command and returns rendered output.
///
/// The interactive `find` command writes to stdout as it goes and returns an
/// empty string.
///
/// # Errors
///
/// Returns an error when credentials are missing, or when a registry or
/// completion request fails.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Find(FindArgs::default()));

    match command {
        Commands::Find(args) => run_find(args, &cli.env_file).await,
        Commands::Search {
            condition,
            location,
            limit,
            mode,
        } => {
            let client = ClinicalTrialsClient::new()?;
            let query = SearchQuery::new(condition, location, clamp_limit(limit));
            let trials = crate::entities::trial::search_patient_friendly(&client, &query).await?;
            if trials.is_empty() {
                return Ok(format!(
                    "No recruiting trials found for \"{}\". Try broadening the condition or location.",
                    query.term()
                ));
            }
            Ok(format_block(&trials, mode.max_summary_chars())
                .trim_end()
                .to_string())
        }
        Commands::Registry => {
            let client = ClinicalTrialsClient::new()?;
            let version = client.version().await?;
            Ok(connection_banner(&version))
        }
        Commands::PingLlm { model } => {
            let credentials = Credentials::load(&cli.env_file)?;
            let client = ChatCompletionsClient::new(
                &credentials,
                CompletionSettings {
                    model,
                    temperature: 0.0,
                    max_tokens: PING_MAX_TOKENS,
                },
            )?;
            Ok(client.complete(PING_PROMPT).await?)
        }
        Commands::Version => Ok(version_output()),
    }
}

/// Parses `args` (including the binary name) and runs the command.
///
/// # Errors
///
/// Returns an error when CLI args cannot be parsed or when command execution fails.
pub async fn execute(mut args: Vec<String>) -> anyhow::Result<String> {
    if args.is_empty() {
        args.push("trialscout".to_string());
    }
    let cli = Cli::try_parse_from(args)?;
    run(cli).await
}
