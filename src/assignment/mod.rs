//! Employee assignment: least-loaded candidate for a (department, priority).

pub mod ledger;
pub mod roster;

pub use ledger::WorkloadLedger;
pub use roster::{Directory, EmployeeId, Priority, Roster, Staff};

use tracing::debug;

/// Log value written when no employee could be assigned.
pub const UNASSIGNED_LABEL: &str = "No employee available";

/// Outcome of an assignment decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Assigned(EmployeeId),
    Unassigned,
}

impl Assignment {
    pub fn employee(&self) -> Option<&str> {
        match self {
            Self::Assigned(employee) => Some(employee),
            Self::Unassigned => None,
        }
    }

    /// Value for the log's "Assigned Employee" column.
    pub fn label(&self) -> &str {
        self.employee().unwrap_or(UNASSIGNED_LABEL)
    }
}

/// Pick the least-loaded candidate and charge one ticket to them.
///
/// Ties go to the earliest candidate in roster order. Callers sharing a
/// ledger must hold its lock across this call.
pub fn assign(
    roster: &Roster,
    ledger: &mut WorkloadLedger,
    department: &str,
    priority: &str,
) -> Assignment {
    let candidates = roster.candidates(department, priority);
    // min_by_key keeps the first of equal minima
    let Some(chosen) = candidates.iter().min_by_key(|e| ledger.count(e)) else {
        debug!(department, priority, "No roster entry for ticket");
        return Assignment::Unassigned;
    };

    ledger.increment(chosen);
    debug!(
        department,
        priority,
        employee = %chosen,
        workload = ledger.count(chosen),
        "Ticket assigned"
    );
    Assignment::Assigned(chosen.clone())
}
