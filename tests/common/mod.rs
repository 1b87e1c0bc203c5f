//! Stub collaborators shared by the intake integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use support_intake::assignment::Staff;
use support_intake::classifier::{Analysis, Classifier};
use support_intake::error::{DeliveryError, LlmError, RecorderError};
use support_intake::intake::{IntakeDeps, IntakeFlow};
use support_intake::notifier::Notifier;
use support_intake::recorder::{LOG_HEADER, LogRow, Recorder};

pub const STAFF_JSON: &str = r#"{
    "departments": [
        {
            "name": "Billing",
            "tiers": {
                "High": ["Tanish"],
                "Medium": ["Mayank", "Yash"],
                "Low": ["Leena", "Ketki"]
            }
        },
        {
            "name": "Sales",
            "tiers": {
                "High": ["Tanish"],
                "Medium": ["Mayank", "Yash"],
                "Low": ["Leena", "Ketki"]
            }
        }
    ],
    "directory": [
        {"employee": "Tanish", "email": "tanish@example.com"},
        {"employee": "Mayank", "email": "mayank@example.com"},
        {"employee": "Yash", "email": "yash@example.com"},
        {"employee": "Leena", "email": "leena@example.com"},
        {"employee": "Ketki", "email": "ketki@example.com"}
    ]
}"#;

pub fn staff() -> Staff {
    Staff::from_json(STAFF_JSON).unwrap()
}

fn unavailable() -> LlmError {
    LlmError::RequestFailed {
        provider: "stub".into(),
        reason: "service unavailable".into(),
    }
}

// ── Classifier ──────────────────────────────────────────────────────

/// Answers from fixed values; `None` makes that call fail.
pub struct StubClassifier {
    pub department: Option<String>,
    pub analysis: Option<Analysis>,
    pub reply: Option<String>,
    pub calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(department: &str, sentiment: &str, priority: &str) -> Self {
        Self {
            department: Some(department.into()),
            analysis: Some(Analysis {
                sentiment: sentiment.into(),
                priority: priority.into(),
            }),
            reply: Some("Thanks for reaching out, we are on it.".into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _text: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.department.clone().ok_or_else(unavailable)
    }

    async fn analyze(&self, _text: &str) -> Result<Analysis, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.analysis.clone().ok_or_else(unavailable)
    }

    async fn respond(&self, _text: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(unavailable)
    }
}

// ── Recorder ────────────────────────────────────────────────────────

/// In-memory log.
pub struct MemoryRecorder {
    pub header: Vec<String>,
    pub rows: Mutex<Vec<LogRow>>,
    pub fail_appends: AtomicBool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<LogRow>) -> Self {
        Self {
            header: LOG_HEADER.iter().map(|s| s.to_string()).collect(),
            rows: Mutex::new(rows),
            fail_appends: AtomicBool::new(false),
        }
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    fn name(&self) -> &str {
        "memory"
    }

    async fn header(&self) -> Result<Vec<String>, RecorderError> {
        Ok(self.header.clone())
    }

    async fn append_row(&self, row: &LogRow) -> Result<(), RecorderError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RecorderError::Http {
                backend: "memory".into(),
                status: Some(503),
                message: "backend unavailable".into(),
            });
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn read_all_rows(&self) -> Result<Vec<LogRow>, RecorderError> {
        Ok(self.rows())
    }
}

pub fn logged_row(employee: &str) -> LogRow {
    LogRow {
        timestamp: "2026-03-01 09:30:00".into(),
        query: "earlier query".into(),
        department: "Billing".into(),
        sentiment: "Neutral".into(),
        priority: "Medium".into(),
        assigned_employee: employee.into(),
        auto_response: "earlier reply".into(),
    }
}

// ── Notifier ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every email; addresses in `failing` are refused.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentEmail>>,
    pub failing: Vec<String>,
}

impl RecordingNotifier {
    pub fn failing_for(address: &str) -> Self {
        Self {
            failing: vec![address.to_string()],
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if self.failing.iter().any(|a| a == to) {
            return Err(DeliveryError::SendFailed {
                to: to.to_string(),
                reason: "mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        });
        Ok(())
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub classifier: Arc<StubClassifier>,
    pub recorder: Arc<MemoryRecorder>,
    pub notifier: Arc<RecordingNotifier>,
    pub flow: Arc<IntakeFlow>,
}

pub async fn harness(
    classifier: StubClassifier,
    recorder: MemoryRecorder,
    notifier: RecordingNotifier,
) -> Harness {
    let classifier = Arc::new(classifier);
    let recorder = Arc::new(recorder);
    let notifier = Arc::new(notifier);
    let flow = IntakeFlow::start(IntakeDeps {
        classifier: classifier.clone(),
        recorder: recorder.clone(),
        notifier: notifier.clone(),
        staff: staff(),
    })
    .await
    .unwrap();

    Harness {
        classifier,
        recorder,
        notifier,
        flow: Arc::new(flow),
    }
}
