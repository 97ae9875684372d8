use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Opaque row identity; never shown to users.
    pub id: String,
    /// Derived display identifier, fixed at creation time.
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub student_email: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    pub department_id: u8,
    pub major_id: u8,
    pub class_id: i64,
    pub is_activated: bool,
}

impl StudentRecord {
    pub fn status_label(&self) -> &'static str {
        status_label(self.is_activated)
    }
}

pub fn status_label(active: bool) -> &'static str {
    if active {
        "Active"
    } else {
        "Inactive"
    }
}

/// Blank input means "no birthday".
pub fn parse_birthday(raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(t.to_string()))
}
