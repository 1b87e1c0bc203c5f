//! Ticket classifier: department, sentiment/priority and a short auto-reply,
//! each produced by one LLM call.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Temperature for all classifier calls.
const CLASSIFIER_TEMPERATURE: f32 = 0.2;

/// Label calls only need a word or two.
const LABEL_MAX_TOKENS: u32 = 32;

/// Max tokens for the auto-reply.
const REPLY_MAX_TOKENS: u32 = 400;

pub const DEFAULT_SENTIMENT: &str = "Neutral";
pub const DEFAULT_PRIORITY: &str = "Medium";

/// Sentiment and priority labels as written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub sentiment: String,
    pub priority: String,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            sentiment: DEFAULT_SENTIMENT.to_string(),
            priority: DEFAULT_PRIORITY.to_string(),
        }
    }
}

/// External classification capability. Every call is a single attempt.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Department label for the query.
    async fn classify(&self, text: &str) -> Result<String, LlmError>;

    /// Sentiment and priority for the query.
    async fn analyze(&self, text: &str) -> Result<Analysis, LlmError>;

    /// Short customer-service reply.
    async fn respond(&self, text: &str) -> Result<String, LlmError>;
}

/// `Classifier` backed by an `LlmProvider`.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
    departments: Vec<String>,
}

impl LlmClassifier {
    /// `departments` is the closed set of labels the model may choose from.
    pub fn new(llm: Arc<dyn LlmProvider>, departments: Vec<String>) -> Self {
        Self { llm, departments }
    }

    async fn ask(&self, prompt: String, max_tokens: u32) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(CLASSIFIER_TEMPERATURE)
            .with_max_tokens(max_tokens);
        let response = self.llm.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, text: &str) -> Result<String, LlmError> {
        let prompt = build_department_prompt(text, &self.departments);
        let raw = self.ask(prompt, LABEL_MAX_TOKENS).await?;
        let label = match_department(&raw, &self.departments);
        info!(department = %label, model = self.llm.model_name(), "Query classified");
        Ok(label)
    }

    async fn analyze(&self, text: &str) -> Result<Analysis, LlmError> {
        let raw = self.ask(build_sentiment_prompt(text), LABEL_MAX_TOKENS).await?;
        let analysis = parse_analysis(&raw).unwrap_or_else(|| {
            warn!(raw = %raw, "Unparseable sentiment reply, using defaults");
            Analysis::default()
        });
        debug!(sentiment = %analysis.sentiment, priority = %analysis.priority, "Query analyzed");
        Ok(analysis)
    }

    async fn respond(&self, text: &str) -> Result<String, LlmError> {
        let reply = self.ask(build_reply_prompt(text), REPLY_MAX_TOKENS).await?;
        debug!(chars = reply.len(), "Auto-reply generated");
        Ok(reply)
    }
}

// ── Prompts ─────────────────────────────────────────────────────────

fn build_department_prompt(query: &str, departments: &[String]) -> String {
    let choices = match departments {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    };
    format!(
        "You are an AI assistant for customer support. Classify this query:\n\
         \"{query}\" into {choices}. Just give the department name."
    )
}

fn build_sentiment_prompt(query: &str) -> String {
    format!(
        "Classify the sentiment (Positive, Neutral, Negative) and map to priority \
         (High, Medium, Low):\n\"{query}\". Reply in format: Sentiment, Priority"
    )
}

fn build_reply_prompt(query: &str) -> String {
    format!("Generate a short customer service response for:\n\"{query}\"")
}

// ── Parsing ─────────────────────────────────────────────────────────

static EDGE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    // Leading/trailing markdown, quotes and punctuation around a label.
    Regex::new(r#"^[\s*_`"'.:\-]+|[\s*_`"'.:!\-]+$"#).expect("valid regex")
});

/// Strip decoration the model tends to put around a bare label.
pub fn clean_label(raw: &str) -> String {
    EDGE_NOISE.replace_all(raw.trim(), "").to_string()
}

/// First letter upper-case, the rest lower-case.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Map the model's answer onto a configured department name.
///
/// Falls back to the cleaned raw label, which the roster will not recognise.
pub fn match_department(raw: &str, departments: &[String]) -> String {
    let cleaned = clean_label(raw);
    departments
        .iter()
        .find(|d| d.eq_ignore_ascii_case(&cleaned))
        .or_else(|| {
            let lower = cleaned.to_ascii_lowercase();
            departments
                .iter()
                .find(|d| lower.contains(&d.to_ascii_lowercase()))
        })
        .cloned()
        .unwrap_or(cleaned)
}

/// Parse a `Sentiment, Priority` reply. Anything but exactly two
/// comma-separated parts is rejected.
pub fn parse_analysis(raw: &str) -> Option<Analysis> {
    let parts: Vec<&str> = raw.trim().split(',').collect();
    let [sentiment, priority] = parts.as_slice() else {
        return None;
    };
    let sentiment = capitalize(&clean_label(sentiment));
    let priority = capitalize(&clean_label(priority));
    if sentiment.is_empty() || priority.is_empty() {
        return None;
    }
    Some(Analysis {
        sentiment,
        priority,
    })
}
