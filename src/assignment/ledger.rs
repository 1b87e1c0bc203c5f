//! Workload ledger: per-employee count of assigned tickets.
//!
//! The ledger is a cache of the ticket log: it is rebuilt from the log's
//! "Assigned Employee" column at startup and only grows in-process.

use std::collections::{BTreeMap, HashMap};

use super::roster::EmployeeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadLedger {
    counts: HashMap<EmployeeId, u32>,
}

impl WorkloadLedger {
    /// Start every known employee at zero, then count historical assignments.
    ///
    /// Values that do not name a known employee are skipped.
    pub fn rebuild<'a, K, A>(known: K, assigned: A) -> Self
    where
        K: IntoIterator<Item = &'a EmployeeId>,
        A: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<EmployeeId, u32> =
            known.into_iter().map(|e| (e.clone(), 0)).collect();
        for employee in assigned {
            if let Some(count) = counts.get_mut(employee.trim()) {
                *count += 1;
            }
        }
        Self { counts }
    }

    pub fn count(&self, employee: &str) -> u32 {
        self.counts.get(employee).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, employee: &str) {
        *self.counts.entry(employee.to_string()).or_insert(0) += 1;
    }

    /// Undo one increment (used when the ticket could not be logged).
    pub fn release(&mut self, employee: &str) {
        if let Some(count) = self.counts.get_mut(employee) {
            *count = count.saturating_sub(1);
        }
    }

    /// Sorted copy for display.
    pub fn snapshot(&self) -> BTreeMap<EmployeeId, u32> {
        self.counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}
