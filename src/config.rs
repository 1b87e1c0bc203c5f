//! Configuration types, read from the environment.
//!
//! Everything goes through a lookup function so tests can supply values
//! without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::notifier::SmtpConfig;
use crate::recorder::sheets::DEFAULT_API_BASE;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the ticket log lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderConfig {
    Sheets {
        key_file: PathBuf,
        spreadsheet_id: String,
        sheet_name: String,
        api_base: String,
        timeout: Duration,
    },
    LibSql {
        path: PathBuf,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    pub recorder: RecorderConfig,
    /// Roster + directory JSON.
    pub staff_file: PathBuf,
    pub port: u16,
    /// Optional directory for a daily rolling log file.
    pub log_dir: Option<PathBuf>,
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let backend: LlmBackend = env
            .optional("INTAKE_LLM_BACKEND")
            .as_deref()
            .unwrap_or("gemini")
            .parse()?;
        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(env.required(backend.key_var())?),
            model: env
                .optional("INTAKE_LLM_MODEL")
                .unwrap_or_else(|| backend.default_model().to_string()),
            timeout: Duration::from_secs(
                env.parsed("INTAKE_LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            ),
        };

        let username = env.required("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: env
                .optional("SMTP_HOST")
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: env.parsed("SMTP_PORT", 587)?,
            password: SecretString::from(env.required("EMAIL_PASSWORD")?),
            from_address: env.optional("SMTP_FROM").unwrap_or_else(|| username.clone()),
            username,
            timeout: Duration::from_secs(env.parsed("SMTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
        };

        let recorder = match env
            .optional("INTAKE_LOG_BACKEND")
            .unwrap_or_else(|| "sheets".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "sheets" => RecorderConfig::Sheets {
                key_file: PathBuf::from(env.required("GOOGLE_SERVICE_ACCOUNT_FILE")?),
                spreadsheet_id: env.required("INTAKE_SPREADSHEET_ID")?,
                sheet_name: env
                    .optional("INTAKE_SHEET_NAME")
                    .unwrap_or_else(|| "Sheet1".to_string()),
                api_base: DEFAULT_API_BASE.to_string(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            "libsql" => RecorderConfig::LibSql {
                path: PathBuf::from(
                    env.optional("INTAKE_DB_PATH")
                        .unwrap_or_else(|| "./data/support-intake.db".to_string()),
                ),
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_LOG_BACKEND".to_string(),
                    message: format!("unknown backend '{other}' (expected sheets or libsql)"),
                });
            }
        };

        Ok(Self {
            llm,
            smtp,
            recorder,
            staff_file: PathBuf::from(
                env.optional("INTAKE_STAFF_FILE")
                    .unwrap_or_else(|| "./config/staff.json".to_string()),
            ),
            port: env.parsed("INTAKE_PORT", 8080)?,
            log_dir: env.optional("INTAKE_LOG_DIR").map(PathBuf::from),
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            }),
        }
    }
}
