//! Credential and model settings for the completion endpoint.

use std::path::Path;

use tracing::debug;

use crate::error::TrialScoutError;

pub const API_BASE_VAR: &str = "LITELLM_API_BASE";
pub const API_KEY_VAR: &str = "LITELLM_API_KEY";
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 250;

/// Secrets for the completion endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub api_base: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolves both secrets from the process environment, falling back to `env_file`.
    ///
    /// # Errors
    ///
    /// Returns [`TrialScoutError::Config`] naming every secret that could not be found.
    pub fn load(env_file: &Path) -> Result<Self, TrialScoutError> {
        Self::resolve(|key| std::env::var(key).ok(), env_file)
    }

    pub(crate) fn resolve<F>(lookup_env: F, env_file: &Path) -> Result<Self, TrialScoutError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup(&lookup_env, API_BASE_VAR, env_file);
        let api_key = lookup(&lookup_env, API_KEY_VAR, env_file);

        match (api_base, api_key) {
            (Some(api_base), Some(api_key)) => Ok(Self { api_base, api_key }),
            (api_base, api_key) => {
                let missing = [
                    api_base.is_none().then_some(API_BASE_VAR),
                    api_key.is_none().then_some(API_KEY_VAR),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
                Err(TrialScoutError::Config(format!(
                    "Missing {} in environment or {}",
                    missing.join(" and "),
                    env_file.display()
                )))
            }
        }
    }
}

fn lookup<F>(lookup_env: &F, key: &str, env_file: &Path) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup_env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        return Some(value);
    }
    let value = read_env_file(env_file, key);
    if value.is_some() {
        debug!(key, file = %env_file.display(), "resolved secret from env file");
    }
    value
}

/// Reads `key` from a dotenv-style file without touching the process environment.
fn read_env_file(env_file: &Path, key: &str) -> Option<String> {
    let entries = dotenvy::from_path_iter(env_file).ok()?;
    entries
        .filter_map(Result::ok)
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Model parameters sent with every completion request.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}
