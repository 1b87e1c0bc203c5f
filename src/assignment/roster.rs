//! Staff tables: the roster of who takes which tickets, and the email
//! directory used to reach them.
//!
//! Both tables are loaded once from a JSON file and validated together:
//! every roster member must have exactly one directory entry.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Employee identifier as written in the log's "Assigned Employee" column.
pub type EmployeeId = String;

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

// ── File format ─────────────────────────────────────────────────────

/// On-disk staff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaffFile {
    pub departments: Vec<DepartmentEntry>,
    pub directory: Vec<DirectoryEntry>,
}

/// One department and its candidate lists per priority.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepartmentEntry {
    pub name: String,
    #[serde(default)]
    pub tiers: BTreeMap<Priority, Vec<EmployeeId>>,
}

/// One employee's email address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryEntry {
    pub employee: EmployeeId,
    pub email: String,
}

// ── Roster ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct DepartmentTiers {
    name: String,
    tiers: BTreeMap<Priority, Vec<EmployeeId>>,
}

/// Department × priority → ordered candidate list. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    departments: Vec<DepartmentTiers>,
}

impl Roster {
    pub fn new(entries: Vec<DepartmentEntry>) -> Self {
        Self {
            departments: entries
                .into_iter()
                .map(|e| DepartmentTiers {
                    name: e.name.trim().to_string(),
                    tiers: e
                        .tiers
                        .into_iter()
                        .map(|(priority, candidates)| {
                            let candidates: Vec<EmployeeId> =
                                candidates.iter().map(|c| c.trim().to_string()).collect();
                            (priority, candidates)
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Department names in declaration order.
    pub fn department_names(&self) -> Vec<&str> {
        self.departments.iter().map(|d| d.name.as_str()).collect()
    }

    /// Map a free-form label onto a configured department name, ignoring case.
    pub fn canonical_department(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.departments
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(label))
            .map(|d| d.name.as_str())
    }

    /// Candidates for a (department, priority) pair, in declared order.
    ///
    /// Unknown department or priority yields an empty slice.
    pub fn candidates(&self, department: &str, priority: &str) -> &[EmployeeId] {
        let Ok(priority) = priority.parse::<Priority>() else {
            return &[];
        };
        self.departments
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(department.trim()))
            .and_then(|d| d.tiers.get(&priority))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every employee named anywhere in the roster, first occurrence order.
    pub fn employees(&self) -> Vec<&EmployeeId> {
        let mut seen = HashSet::new();
        self.departments
            .iter()
            .flat_map(|d| d.tiers.values())
            .flatten()
            .filter(|e| seen.insert(e.as_str()))
            .collect()
    }
}

// ── Directory ───────────────────────────────────────────────────────

/// Employee → email address.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: BTreeMap<EmployeeId, String>,
}

impl Directory {
    pub fn email_for(&self, employee: &str) -> Option<&str> {
        self.entries.get(employee).map(String::as_str)
    }

    pub fn employees(&self) -> impl Iterator<Item = &EmployeeId> {
        self.entries.keys()
    }
}

// ── Staff ───────────────────────────────────────────────────────────

/// Validated roster plus directory.
#[derive(Debug, Clone)]
pub struct Staff {
    pub roster: Roster,
    pub directory: Directory,
}

impl Staff {
    /// Load and validate the staff file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let staff = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            departments = staff.roster.department_names().len(),
            employees = staff.roster.employees().len(),
            "Staff configuration loaded"
        );
        Ok(staff)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: StaffFile =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_file(file)
    }

    /// Validate both tables and build the staff model.
    pub fn from_file(file: StaffFile) -> Result<Self, ConfigError> {
        if file.departments.is_empty() {
            return Err(ConfigError::InvalidStaff("no departments configured".into()));
        }

        let mut entries = BTreeMap::new();
        for entry in file.directory {
            let employee = entry.employee.trim().to_string();
            if employee.is_empty() {
                return Err(ConfigError::InvalidStaff(
                    "directory entry with empty employee name".into(),
                ));
            }
            let email = entry.email.trim().to_string();
            email.parse::<lettre::Address>().map_err(|e| {
                ConfigError::InvalidStaff(format!("invalid email for {employee}: {email} ({e})"))
            })?;
            if entries.insert(employee.clone(), email).is_some() {
                return Err(ConfigError::InvalidStaff(format!(
                    "employee {employee} has more than one directory entry"
                )));
            }
        }

        let mut names = HashSet::new();
        for dept in &file.departments {
            let name = dept.name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidStaff("department with empty name".into()));
            }
            if !names.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::InvalidStaff(format!(
                    "department {name} declared twice"
                )));
            }
            for (priority, candidates) in &dept.tiers {
                let mut seen = HashSet::new();
                for employee in candidates.iter().map(|c| c.trim()) {
                    if !seen.insert(employee) {
                        return Err(ConfigError::InvalidStaff(format!(
                            "{employee} listed twice for {name}/{priority}"
                        )));
                    }
                    if !entries.contains_key(employee) {
                        return Err(ConfigError::InvalidStaff(format!(
                            "{employee} ({name}/{priority}) has no directory entry"
                        )));
                    }
                }
            }
        }

        let roster = Roster::new(file.departments);
        let rostered: HashSet<&str> = roster.employees().into_iter().map(String::as_str).collect();
        for employee in entries.keys() {
            if !rostered.contains(employee.as_str()) {
                warn!(employee = %employee, "Directory entry is not on any roster tier");
            }
        }

        Ok(Self {
            roster,
            directory: Directory { entries },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAFF: &str = r#"{
        "departments": [
            {"name": "Billing", "tiers": {"High": ["Tanish"], "Medium": ["Mayank", "Yash"], "Low": ["Leena", "Ketki"]}},
            {"name": "Sales", "tiers": {"High": ["Tanish"]}}
        ],
        "directory": [
            {"employee": "Tanish", "email": "tanish@example.com"},
            {"employee": "Mayank", "email": "mayank@example.com"},
            {"employee": "Yash", "email": "yash@example.com"},
            {"employee": "Leena", "email": "leena@example.com"},
            {"employee": "Ketki", "email": "ketki@example.com"}
        ]
    }"#;

    #[test]
    fn parses_priority_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" medium ".parse::<Priority>(), Ok(Priority::Medium));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn loads_valid_staff() {
        let staff = Staff::from_json(STAFF).unwrap();
        assert_eq!(staff.roster.department_names(), vec!["Billing", "Sales"]);
        assert_eq!(staff.roster.candidates("Billing", "Medium"), ["Mayank", "Yash"]);
        assert_eq!(staff.directory.email_for("Yash"), Some("yash@example.com"));
        assert_eq!(
            staff.roster.employees(),
            vec!["Tanish", "Mayank", "Yash", "Leena", "Ketki"]
        );
    }

    #[test]
    fn candidates_for_unknown_keys_are_empty() {
        let staff = Staff::from_json(STAFF).unwrap();
        assert!(staff.roster.candidates("Legal", "High").is_empty());
        assert!(staff.roster.candidates("Billing", "Urgent").is_empty());
        assert!(staff.roster.candidates("Sales", "Low").is_empty());
    }

    #[test]
    fn canonical_department_ignores_case() {
        let staff = Staff::from_json(STAFF).unwrap();
        assert_eq!(staff.roster.canonical_department("billing"), Some("Billing"));
        assert_eq!(staff.roster.canonical_department(" SALES "), Some("Sales"));
        assert_eq!(staff.roster.canonical_department("Legal"), None);
    }

    #[test]
    fn rejects_duplicate_directory_entry() {
        let raw = r#"{
            "departments": [{"name": "Billing", "tiers": {"High": ["A"]}}],
            "directory": [
                {"employee": "A", "email": "a@example.com"},
                {"employee": "A", "email": "a@example.comm"}
            ]
        }"#;
        let err = Staff::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStaff(msg) if msg.contains("more than one")));
    }

    #[test]
    fn rejects_roster_member_without_directory_entry() {
        let raw = r#"{
            "departments": [{"name": "Billing", "tiers": {"High": ["A", "B"]}}],
            "directory": [{"employee": "A", "email": "a@example.com"}]
        }"#;
        let err = Staff::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStaff(msg) if msg.contains("B")));
    }

    #[test]
    fn rejects_malformed_email() {
        let raw = r#"{
            "departments": [{"name": "Billing", "tiers": {"High": ["A"]}}],
            "directory": [{"employee": "A", "email": "not-an-address"}]
        }"#;
        assert!(matches!(
            Staff::from_json(raw),
            Err(ConfigError::InvalidStaff(_))
        ));
    }

    #[test]
    fn rejects_duplicate_department_and_candidate() {
        let dup_dept = r#"{
            "departments": [{"name": "Billing"}, {"name": "billing"}],
            "directory": []
        }"#;
        assert!(Staff::from_json(dup_dept).is_err());

        let dup_candidate = r#"{
            "departments": [{"name": "Billing", "tiers": {"Low": ["A", "A"]}}],
            "directory": [{"employee": "A", "email": "a@example.com"}]
        }"#;
        assert!(Staff::from_json(dup_candidate).is_err());
    }

    #[test]
    fn padded_names_are_trimmed() {
        let raw = r#"{
            "departments": [{"name": "Billing ", "tiers": {"High": [" A "]}}],
            "directory": [{"employee": "A", "email": "a@example.com"}]
        }"#;
        let staff = Staff::from_json(raw).unwrap();
        assert_eq!(staff.roster.department_names(), vec!["Billing"]);
        assert_eq!(staff.roster.canonical_department("billing"), Some("Billing"));
        assert_eq!(staff.roster.candidates("Billing", "High"), ["A"]);
        assert_eq!(staff.roster.employees(), vec!["A"]);
    }

    #[test]
    fn padded_duplicate_candidate_is_rejected() {
        let raw = r#"{
            "departments": [{"name": "Billing", "tiers": {"Low": ["A", " A"]}}],
            "directory": [{"employee": "A", "email": "a@example.com"}]
        }"#;
        assert!(Staff::from_json(raw).is_err());
    }

    #[test]
    fn rejects_empty_department_list() {
        let raw = r#"{"departments": [], "directory": []}"#;
        assert!(Staff::from_json(raw).is_err());
    }
}
