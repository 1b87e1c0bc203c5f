//! Intake flow: one submission in, one logged ticket and two emails out.
//!
//! Flow:
//! 1. Validate email + query (no external call on failure)
//! 2. Classifier: department → sentiment/priority → auto-reply
//! 3. Assign the least-loaded rostered employee
//! 4. Append the ticket row to the log
//! 5. Email the assignee (if any) and the submitter

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::assignment::{self, Assignment, EmployeeId, Staff, WorkloadLedger};
use crate::classifier::{Analysis, Classifier};
use crate::error::{ClassifierStage, Error, IntakeError};
use crate::notifier::Notifier;
use crate::recorder::{self, LogRow, Recorder, TIMESTAMP_FORMAT};

/// Shown when email or query is missing.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill both Email and Query!";

/// Shown when the email does not parse as an address.
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";

/// Shown once the ticket is logged and both emails were attempted.
pub const SUCCESS_MESSAGE: &str = "We have received your query, please check your Email";

pub const SUBMITTER_SUBJECT: &str = "Query Received – AI Support";

/// A form submission.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Submission {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub query: String,
}

/// A classified, assigned ticket. Written once to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub timestamp: String,
    pub query: String,
    pub department: String,
    pub sentiment: String,
    pub priority: String,
    pub assignment: Assignment,
    pub auto_response: String,
}

impl Ticket {
    pub fn to_log_row(&self) -> LogRow {
        LogRow {
            timestamp: self.timestamp.clone(),
            query: self.query.clone(),
            department: self.department.clone(),
            sentiment: self.sentiment.clone(),
            priority: self.priority.clone(),
            assigned_employee: self.assignment.label().to_string(),
            auto_response: self.auto_response.clone(),
        }
    }
}

/// Who an email was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Assignee,
    Submitter,
}

/// Result of one email attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub recipient: Recipient,
    pub address: String,
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything that happened to a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub ticket: Ticket,
    pub deliveries: Vec<DeliveryReport>,
}

impl SubmissionOutcome {
    pub fn failed_deliveries(&self) -> impl Iterator<Item = &DeliveryReport> {
        self.deliveries.iter().filter(|d| !d.delivered())
    }
}

/// The collaborators an `IntakeFlow` is built from.
pub struct IntakeDeps {
    pub classifier: Arc<dyn Classifier>,
    pub recorder: Arc<dyn Recorder>,
    pub notifier: Arc<dyn Notifier>,
    pub staff: Staff,
}

/// Per-process intake context: collaborators, staff tables and the ledger.
pub struct IntakeFlow {
    classifier: Arc<dyn Classifier>,
    recorder: Arc<dyn Recorder>,
    notifier: Arc<dyn Notifier>,
    staff: Staff,
    ledger: Mutex<WorkloadLedger>,
}

impl IntakeFlow {
    /// Verify the log header and rebuild the ledger from the log.
    ///
    /// Fails (and the service must not start) on a header mismatch or an
    /// unreadable log.
    pub async fn start(deps: IntakeDeps) -> Result<Self, Error> {
        recorder::verify_header(deps.recorder.as_ref()).await?;

        let history = deps.recorder.read_all_rows().await?;
        let ledger = WorkloadLedger::rebuild(
            deps.staff.roster.employees(),
            history.iter().map(|row| row.assigned_employee.as_str()),
        );
        info!(
            rows = history.len(),
            employees = ledger.snapshot().len(),
            "Workload ledger rebuilt from ticket log"
        );

        Ok(Self {
            classifier: deps.classifier,
            recorder: deps.recorder,
            notifier: deps.notifier,
            staff: deps.staff,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn staff(&self) -> &Staff {
        &self.staff
    }

    /// Current per-employee ticket counts.
    pub async fn workload(&self) -> BTreeMap<EmployeeId, u32> {
        self.ledger.lock().await.snapshot()
    }

    /// Run one submission through the whole flow.
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome, IntakeError> {
        let (email, query) = validate(&submission)?;
        let submission_id = Uuid::new_v4();
        self.process(submission_id, email, query)
            .instrument(info_span!("submission", id = %submission_id))
            .await
    }

    async fn process(
        &self,
        submission_id: Uuid,
        email: String,
        query: String,
    ) -> Result<SubmissionOutcome, IntakeError> {
        info!(submitter = %email, chars = query.len(), "Processing submission");

        let department = self.classifier.classify(&query).await.map_err(|source| {
            error!(error = %source, "Department classification failed");
            IntakeError::ClassifierUnavailable {
                stage: ClassifierStage::Department,
                source,
            }
        })?;

        let analysis = self.classifier.analyze(&query).await.unwrap_or_else(|e| {
            warn!(error = %e, "Sentiment analysis failed, using defaults");
            Analysis::default()
        });

        let auto_response = self.classifier.respond(&query).await.map_err(|source| {
            error!(error = %source, "Auto-reply generation failed");
            IntakeError::ClassifierUnavailable {
                stage: ClassifierStage::Reply,
                source,
            }
        })?;

        let assignment = {
            let mut ledger = self.ledger.lock().await;
            assignment::assign(
                &self.staff.roster,
                &mut ledger,
                &department,
                &analysis.priority,
            )
        };

        let ticket = Ticket {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            query,
            department,
            sentiment: analysis.sentiment,
            priority: analysis.priority,
            assignment,
            auto_response,
        };

        if let Err(e) = self.recorder.append_row(&ticket.to_log_row()).await {
            error!(error = %e, backend = self.recorder.name(), "Failed to log ticket");
            if let Some(employee) = ticket.assignment.employee() {
                self.ledger.lock().await.release(employee);
            }
            return Err(e.into());
        }

        info!(
            department = %ticket.department,
            sentiment = %ticket.sentiment,
            priority = %ticket.priority,
            assigned = %ticket.assignment.label(),
            "Ticket logged"
        );

        let deliveries = self.notify(&ticket, &email).await;

        Ok(SubmissionOutcome {
            submission_id,
            ticket,
            deliveries,
        })
    }

    /// Email the assignee (when there is one) and the submitter.
    async fn notify(&self, ticket: &Ticket, submitter: &str) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(2);

        if let Some(employee) = ticket.assignment.employee() {
            match self.staff.directory.email_for(employee) {
                Some(address) => {
                    let subject = format!("New Support Ticket Assigned ({})", ticket.priority);
                    reports.push(
                        self.deliver(Recipient::Assignee, address, &subject, &assignee_body(ticket))
                            .await,
                    );
                }
                None => warn!(employee, "Assigned employee has no directory entry"),
            }
        }

        reports.push(
            self.deliver(
                Recipient::Submitter,
                submitter,
                SUBMITTER_SUBJECT,
                &submitter_body(ticket),
            )
            .await,
        );

        reports
    }

    async fn deliver(
        &self,
        recipient: Recipient,
        address: &str,
        subject: &str,
        body: &str,
    ) -> DeliveryReport {
        let error = match self.notifier.send(address, subject, body).await {
            Ok(()) => None,
            Err(e) => {
                error!(recipient = ?recipient, error = %e, "Email failed");
                Some(e.to_string())
            }
        };
        DeliveryReport {
            recipient,
            address: address.to_string(),
            error,
        }
    }
}

/// Trimmed (email, query), or the warning to show the submitter.
pub fn validate(submission: &Submission) -> Result<(String, String), IntakeError> {
    let email = submission.email.trim();
    let query = submission.query.trim();
    if email.is_empty() || query.is_empty() {
        return Err(IntakeError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
    }
    if email.parse::<lettre::Address>().is_err() {
        return Err(IntakeError::Validation(INVALID_EMAIL_MESSAGE.to_string()));
    }
    Ok((email.to_string(), query.to_string()))
}

/// Message shown to the submitter for a failed submission.
pub fn user_message(error: &IntakeError) -> String {
    match error {
        IntakeError::Validation(message) => message.clone(),
        IntakeError::ClassifierUnavailable { .. } => {
            "Our support assistant is unavailable right now. Please try again later.".to_string()
        }
        IntakeError::Recorder(_) => {
            "We could not record your query. Please try again later.".to_string()
        }
    }
}

fn assignee_body(ticket: &Ticket) -> String {
    format!(
        "You've been assigned a ticket:\n\nQuery: {}\nPriority: {}\nDepartment: {}",
        ticket.query, ticket.priority, ticket.department
    )
}

fn submitter_body(ticket: &Ticket) -> String {
    format!(
        "Hi,\n\nWe received your query:\n\n\"{}\"\n\nOur support team from {} will get back shortly.\n\nThank you!",
        ticket.query, ticket.department
    )
}
