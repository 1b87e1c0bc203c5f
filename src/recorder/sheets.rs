//! Google Sheets ticket log over the Sheets v4 REST API.
//!
//! Authentication uses a service-account key: a short-lived RS256 JWT is
//! exchanged at the key's token URI for an OAuth access token, which is
//! reused until shortly before it expires.
//! See: https://developers.google.com/identity/protocols/oauth2/service-account

use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ConfigError, RecorderError};
use crate::recorder::{LogRow, Recorder};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Lifetime requested for the signed assertion.
const ASSERTION_TTL_SECS: u64 = 3600;

/// Refresh the access token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const BACKEND: &str = "sheets";

/// The fields of a service-account JSON key that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ConfigError::ParseError(format!(
                "service account key {}: {e}",
                path.display()
            ))
        })
    }
}

/// Where the log lives and how to reach it.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub key: ServiceAccountKey,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub api_base: String,
    pub timeout: Duration,
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

/// `Recorder` backed by one worksheet of a Google spreadsheet.
pub struct SheetsRecorder {
    config: SheetsConfig,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsRecorder {
    pub fn new(config: SheetsConfig) -> Result<Self, RecorderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecorderError::Http {
                backend: BACKEND.into(),
                status: None,
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        info!(
            spreadsheet = %config.spreadsheet_id,
            sheet = %config.sheet_name,
            account = %config.key.client_email,
            "Using Google Sheets ticket log"
        );
        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// A1 range on the configured sheet, quoting the sheet name when needed.
    fn range(&self, cells: &str) -> String {
        format!("{}!{cells}", quote_sheet_name(&self.config.sheet_name))
    }

    fn values_url(&self, range: &str) -> Result<Url, RecorderError> {
        let mut url = Url::parse(&self.config.api_base).map_err(|e| RecorderError::Http {
            backend: BACKEND.into(),
            status: None,
            message: format!("Invalid API base URL: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|_| RecorderError::Http {
                backend: BACKEND.into(),
                status: None,
                message: "API base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range,
            ]);
        Ok(url)
    }

    fn signed_assertion(&self, now: u64) -> Result<String, RecorderError> {
        #[derive(Debug, Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        let claims = Claims {
            iss: &self.config.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.config.key.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.config.key.private_key.expose_secret().as_bytes())
            .map_err(|e| RecorderError::Auth {
                backend: BACKEND.into(),
                reason: format!("invalid private key: {e}"),
            })?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
            RecorderError::Auth {
                backend: BACKEND.into(),
                reason: e.to_string(),
            }
        })
    }

    /// Current access token, exchanging a fresh assertion when needed.
    async fn access_token(&self) -> Result<SecretString, RecorderError> {
        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default = "default_expires_in")]
            expires_in: u64,
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.token.clone());
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RecorderError::Auth {
                backend: BACKEND.into(),
                reason: e.to_string(),
            })?
            .as_secs();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .client
            .post(&self.config.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RecorderError::Auth {
                backend: BACKEND.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecorderError::Auth {
                backend: BACKEND.into(),
                reason: format!("token exchange returned {status}: {body}"),
            });
        }

        let payload: TokenResponse = response.json().await.map_err(|e| RecorderError::Auth {
            backend: BACKEND.into(),
            reason: format!("malformed token response: {e}"),
        })?;

        let lifetime = Duration::from_secs(payload.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let token = SecretString::from(payload.access_token);
        *cached = Some(CachedToken {
            token: token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        debug!(expires_in = payload.expires_in, "Obtained Sheets access token");
        Ok(token)
    }

    async fn get_values(&self, cells: &str) -> Result<Vec<Vec<String>>, RecorderError> {
        #[derive(Debug, Deserialize)]
        struct ValueRange {
            #[serde(default)]
            values: Vec<Vec<serde_json::Value>>,
        }

        let url = self.values_url(&self.range(cells))?;
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(http_error)?;
        let response = check_status(response).await?;
        let body: ValueRange = response.json().await.map_err(http_error)?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn default_expires_in() -> u64 {
    3600
}

#[async_trait]
impl Recorder for SheetsRecorder {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn header(&self) -> Result<Vec<String>, RecorderError> {
        let rows = self.get_values("1:1").await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn append_row(&self, row: &LogRow) -> Result<(), RecorderError> {
        #[derive(Serialize)]
        struct AppendBody {
            values: Vec<[String; 7]>,
        }

        let range = format!("{}:append", self.range("A:G"));
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let token = self.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&AppendBody {
                values: vec![row.to_cells()],
            })
            .send()
            .await
            .map_err(http_error)?;
        check_status(response).await?;

        debug!(employee = %row.assigned_employee, "Ticket row appended to sheet");
        Ok(())
    }

    async fn read_all_rows(&self) -> Result<Vec<LogRow>, RecorderError> {
        let rows = self.get_values("A:G").await?;
        Ok(rows
            .iter()
            .skip(1)
            .map(|cells| LogRow::from_cells(cells))
            .collect())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Quote a sheet name for A1 notation unless it is a plain identifier.
pub fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn http_error(e: reqwest::Error) -> RecorderError {
    RecorderError::Http {
        backend: BACKEND.into(),
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RecorderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(RecorderError::Http {
        backend: BACKEND.into(),
        status: Some(status.as_u16()),
        message,
    })
}
