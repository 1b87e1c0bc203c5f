//! Support ticket intake: the submission flow and its HTTP surface.

pub mod flow;
pub mod page;
pub mod routes;

pub use flow::{
    DeliveryReport, IntakeDeps, IntakeFlow, Recipient, Submission, SubmissionOutcome, Ticket,
};
pub use routes::{IntakeRouteState, intake_routes};
