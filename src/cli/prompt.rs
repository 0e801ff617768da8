//! Line-oriented console questions.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::entities::trial::{DEFAULT_TRIAL_LIMIT, clamp_limit};

/// Asks one question and returns the trimmed answer, or `default` when the
/// answer is blank or input is exhausted.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
    default: &str,
) -> io::Result<String> {
    write!(out, "{prompt}: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialCount {
    pub value: usize,
    pub warning: Option<String>,
}

/// Parses the requested number of trials. Out-of-range numbers are clamped
/// quietly; anything that is not an integer falls back to the default.
pub fn parse_trial_count(raw: &str) -> TrialCount {
    match raw.trim().parse::<i64>() {
        Ok(requested) => {
            let value = clamp_limit(requested);
            if value as i64 != requested {
                debug!(requested, value, "clamped trial count");
            }
            TrialCount {
                value,
                warning: None,
            }
        }
        Err(_) => TrialCount {
            value: DEFAULT_TRIAL_LIMIT,
            warning: Some(format!(
                "Invalid input, using default of {DEFAULT_TRIAL_LIMIT}."
            )),
        },
    }
}
