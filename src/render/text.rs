//! Plain-text presentation of trial briefs and the summarization prompts.

use minijinja::{Environment, context};

use crate::entities::trial::TrialBrief;
use crate::error::TrialScoutError;
use crate::sources::clinicaltrials::CtGovVersion;

/// Summary length used by [`PresenterMode::Inline`].
pub const INLINE_SUMMARY_CHARS: usize = 400;
pub const ELLIPSIS: &str = "...";

const UNTITLED: &str = "Untitled Study";
const NO_ID: &str = "N/A";
const UNKNOWN_STATUS: &str = "Unknown";
const NO_CONDITIONS: &str = "Not specified";

const INLINE_PROMPT: &str = "\
You are a concise, empathetic assistant helping a patient discover clinical trials.
Patient: age {{ age }}, condition '{{ condition }}', location '{{ location }}'.
You have a short list of trial options below. Write a warm, 5–7 sentence summary of what we found, \
include 1–2 concrete next steps (e.g., confirm eligibility details, contact site), \
and remind them results are informational (not medical advice). Then list the trials in a bullet list.

TRIALS:
{{ trials }}";

const NARRATIVE_PROMPT: &str = "\
You are a concise, empathetic assistant helping a patient discover clinical trials.
Patient: age {{ age }}, condition '{{ condition }}', location '{{ location }}'.
You have a short list of trial options below. Write one warm, 5–7 sentence paragraph about what we found, \
include 1–2 concrete next steps (e.g., confirm eligibility details, contact site), \
and remind them results are informational (not medical advice). \
Do not list the trials yourself; the full list is shown to the patient right after your paragraph.

TRIALS:
{{ trials }}";

/// How the model output and the trial listing are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PresenterMode {
    /// Summaries cut to 400 characters; the model writes the summary and lists the trials.
    Inline,
    /// Full summaries; the model writes only the narrative, followed by the listing.
    #[default]
    Separate,
}

impl PresenterMode {
    pub fn max_summary_chars(self) -> Option<usize> {
        match self {
            Self::Inline => Some(INLINE_SUMMARY_CHARS),
            Self::Separate => None,
        }
    }

    fn prompt_template(self) -> (&'static str, &'static str) {
        match self {
            Self::Inline => ("inline_summary.txt", INLINE_PROMPT),
            Self::Separate => ("narrative_summary.txt", NARRATIVE_PROMPT),
        }
    }
}

/// What the patient told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientProfile {
    pub age: String,
    pub condition: String,
    pub location: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn summary_line(summary: &str, max_chars: Option<usize>) -> String {
    let collapsed = summary.replace('\n', " ");
    let collapsed = collapsed.trim();
    match max_chars {
        Some(max) if collapsed.chars().count() > max => {
            let mut out = collapsed.chars().take(max).collect::<String>();
            out.push_str(ELLIPSIS);
            out
        }
        _ => collapsed.to_string(),
    }
}

fn format_one(index: usize, brief: &TrialBrief, max_summary_chars: Option<usize>) -> String {
    let title = non_empty(brief.title.as_deref()).unwrap_or(UNTITLED);
    let nct = non_empty(brief.nct_id.as_deref()).unwrap_or(NO_ID);
    let status = non_empty(brief.overall_status.as_deref())
        .unwrap_or(UNKNOWN_STATUS)
        .to_uppercase();
    let conditions = if brief.conditions.is_empty() {
        NO_CONDITIONS.to_string()
    } else {
        brief.conditions.join(", ")
    };
    let summary = summary_line(&brief.summary, max_summary_chars);

    format!(
        "{index}. {title} (NCT: {nct})\n   Status: {status}\n   Conditions: {conditions}\n   Summary: {summary}\n"
    )
}

/// Numbered four-line block per trial, separated by blank lines.
pub fn format_block(briefs: &[TrialBrief], max_summary_chars: Option<usize>) -> String {
    briefs
        .iter()
        .enumerate()
        .map(|(i, brief)| format_one(i + 1, brief, max_summary_chars))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the user prompt sent to the completion endpoint.
pub fn summary_prompt(
    mode: PresenterMode,
    profile: &PatientProfile,
    trials_block: &str,
) -> Result<String, TrialScoutError> {
    let (name, source) = mode.prompt_template();
    let mut env = Environment::new();
    env.add_template(name, source)?;
    let rendered = env.get_template(name)?.render(context! {
        age => profile.age,
        condition => profile.condition,
        location => profile.location,
        trials => trials_block,
    })?;
    Ok(rendered)
}

/// Console text following the model call.
pub fn console_output(mode: PresenterMode, narrative: &str, trials_block: &str) -> String {
    match mode {
        PresenterMode::Inline => narrative.trim_end().to_string(),
        PresenterMode::Separate => format!(
            "{}\n\nTrials found:\n\n{}",
            narrative.trim_end(),
            trials_block.trim_end()
        ),
    }
}

/// Contents of the persisted query file.
pub fn saved_query(profile: &PatientProfile, trials_block: &str) -> String {
    format!(
        "age={}\ncondition={}\nlocation={}\n\n{trials_block}",
        profile.age, profile.condition, profile.location
    )
}

pub fn connection_banner(version: &CtGovVersion) -> String {
    format!(
        "Connected to ClinicalTrials.gov API v{} (data snapshot {})",
        version.api_version.as_deref().unwrap_or("unknown"),
        version.data_timestamp.as_deref().unwrap_or("unknown")
    )
}
