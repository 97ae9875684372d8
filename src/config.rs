use crate::codes::CLASS_ORDINALS;
use crate::db;
use crate::table::PAGE_SIZES;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::PathBuf;

/// Process-level settings taken from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let log_filter = env::var("ROSTERD_LOG").unwrap_or_else(|_| "info".to_string());
        let workspace = env::var("ROSTERD_WORKSPACE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self {
            log_filter,
            workspace,
        }
    }
}

pub const ROSTER_SETTINGS_KEY: &str = "setup.roster";

/// Per-workspace defaults for the add-student form and the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSettings {
    pub enrollment_year: i64,
    pub default_page_size: usize,
    pub default_department_id: u8,
    pub default_major_id: u8,
    pub default_class_ordinal: u8,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            enrollment_year: 2021,
            default_page_size: 10,
            default_department_id: 5,
            default_major_id: 4,
            default_class_ordinal: 2,
        }
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

impl RosterSettings {
    /// Stored values are applied best-effort on top of the defaults.
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let mut current = Self::default();
        if let Some(saved) = db::settings_get_json(conn, ROSTER_SETTINGS_KEY)? {
            if let Some(obj) = saved.as_object() {
                for (k, v) in obj {
                    let mut one = Map::new();
                    one.insert(k.clone(), v.clone());
                    let _ = current.merge_patch(&one);
                }
            }
        }
        Ok(current)
    }

    pub fn save(&self, conn: &Connection) -> anyhow::Result<()> {
        db::settings_set_json(conn, ROSTER_SETTINGS_KEY, &serde_json::to_value(self)?)
    }

    /// All-or-nothing: on error `self` is left untouched.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = *self;
        for (k, v) in patch {
            match k.as_str() {
                "enrollmentYear" => {
                    next.enrollment_year = parse_i64_range(v, k, 2000, 2099)?;
                }
                "defaultPageSize" => {
                    let n = parse_i64_range(v, k, 1, 50)? as usize;
                    if !PAGE_SIZES.contains(&n) {
                        return Err("defaultPageSize must be one of: 5, 10, 25, 50".into());
                    }
                    next.default_page_size = n;
                }
                "defaultDepartmentId" => {
                    next.default_department_id = parse_i64_range(v, k, 0, 99)? as u8;
                }
                "defaultMajorId" => {
                    next.default_major_id = parse_i64_range(v, k, 0, 99)? as u8;
                }
                "defaultClassOrdinal" => {
                    let n = parse_i64_range(v, k, 0, 99)? as u8;
                    if !CLASS_ORDINALS.contains(&n) {
                        return Err(format!(
                            "defaultClassOrdinal must be one of: {:?}",
                            CLASS_ORDINALS
                        ));
                    }
                    next.default_class_ordinal = n;
                }
                _ => return Err(format!("unknown roster field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn defaults_match_the_add_student_form() {
        let s = RosterSettings::default();
        assert_eq!(s.enrollment_year, 2021);
        assert_eq!((s.default_department_id, s.default_major_id), (5, 4));
        assert_eq!(s.default_page_size, 10);
    }

    #[test]
    fn merge_patch_validates_every_field() {
        let mut s = RosterSettings::default();
        s.merge_patch(&patch(json!({ "enrollmentYear": 2024, "defaultPageSize": 25 })))
            .unwrap();
        assert_eq!(s.enrollment_year, 2024);
        assert_eq!(s.default_page_size, 25);

        let before = s;
        assert!(s
            .merge_patch(&patch(json!({ "enrollmentYear": 2025, "defaultPageSize": 20 })))
            .is_err());
        assert_eq!(s, before);
        assert!(s.merge_patch(&patch(json!({ "defaultClassOrdinal": 3 }))).is_err());
        assert!(s.merge_patch(&patch(json!({ "nickname": "x" }))).is_err());
    }
}
