//! The interactive trial-finding conversation.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::prompt::{ask, parse_trial_count};
use crate::entities::trial::{SearchQuery, search_patient_friendly};
use crate::error::TrialScoutError;
use crate::render::text::{
    PatientProfile, PresenterMode, connection_banner, console_output, format_block,
    saved_query, summary_prompt,
};
use crate::sources::clinicaltrials::ClinicalTrialsClient;
use crate::sources::completion::CompletionClient;

pub const DEFAULT_OUTPUT_PATH: &str = "data/last_query.txt";

const DEFAULT_CONDITION: &str = "breast cancer";
const DEFAULT_AGE: &str = "50";
const DEFAULT_LOCATION: &str = "California";
const DEFAULT_COUNT: &str = "6";

/// Answers supplied up front (e.g. from flags); `None` means ask.
#[derive(Debug, Clone, Default)]
pub struct PresetAnswers {
    pub condition: Option<String>,
    pub age: Option<String>,
    pub location: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub answers: PresetAnswers,
    pub mode: PresenterMode,
    pub output_path: PathBuf,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            answers: PresetAnswers::default(),
            mode: PresenterMode::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    NoTrials,
    Saved { path: PathBuf, trials: usize },
}

fn answer_or_ask<R: BufRead, W: Write>(
    preset: Option<&str>,
    input: &mut R,
    out: &mut W,
    prompt: &str,
    default: &str,
) -> std::io::Result<String> {
    match preset.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => Ok(value.to_string()),
        None => ask(input, out, prompt, default),
    }
}

async fn persist(path: &Path, contents: &str) -> Result<(), TrialScoutError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!(path = %path.display(), "saved query results");
    Ok(())
}

/// Runs one full conversation: banner, questions, search, summary, save.
///
/// Every network call is awaited before the next one starts.
///
/// # Errors
///
/// Returns an error when a registry or completion request fails, or when the
/// console or output file cannot be written. An empty search result is not an error.
pub async fn run_session<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    registry: &ClinicalTrialsClient,
    completion: &dyn CompletionClient,
    options: &SessionOptions,
) -> Result<SessionOutcome, TrialScoutError> {
    let version = registry.version().await?;
    writeln!(out, "{}\n", connection_banner(&version))?;
    writeln!(
        out,
        "Hi! I'll ask a few quick questions to find relevant clinical trials.\n"
    )?;

    let answers = &options.answers;
    let condition = answer_or_ask(
        answers.condition.as_deref(),
        input,
        out,
        "What condition are you looking for trials for?",
        DEFAULT_CONDITION,
    )?;
    let age = answer_or_ask(
        answers.age.as_deref(),
        input,
        out,
        "How old are you?",
        DEFAULT_AGE,
    )?;
    let location = answer_or_ask(
        answers.location.as_deref(),
        input,
        out,
        "Where are you located? (state or country)",
        DEFAULT_LOCATION,
    )?;
    let raw_count = answer_or_ask(
        answers.count.as_deref(),
        input,
        out,
        "How many trial options would you like to see? (1–10)",
        DEFAULT_COUNT,
    )?;
    let count = parse_trial_count(&raw_count);
    if let Some(warning) = &count.warning {
        writeln!(out, "{warning}")?;
    }

    let query = SearchQuery::new(condition.clone(), Some(location.clone()), count.value);
    let trials = search_patient_friendly(registry, &query).await?;
    if trials.is_empty() {
        writeln!(
            out,
            "\nSorry, I couldn't find recruiting trials with those inputs. Try broadening the condition or location."
        )?;
        return Ok(SessionOutcome::NoTrials);
    }

    let profile = PatientProfile {
        age,
        condition,
        location,
    };
    let block = format_block(&trials, options.mode.max_summary_chars());
    let prompt = summary_prompt(options.mode, &profile, &block)?;
    let narrative = completion.complete(&prompt).await?;
    writeln!(out, "\n{}", console_output(options.mode, &narrative, &block))?;

    persist(&options.output_path, &saved_query(&profile, &block)).await?;
    writeln!(out, "\nSaved results to {}", options.output_path.display())?;
    writeln!(
        out,
        "\nIf any title looks promising, tell me its number next time and I can fetch more details."
    )?;

    Ok(SessionOutcome::Saved {
        path: options.output_path.clone(),
        trials: trials.len(),
    })
}
