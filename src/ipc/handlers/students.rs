use super::codes::department_and_major;
use crate::codes;
use crate::config::RosterSettings;
use crate::db;
use crate::error::ValidationError;
use crate::ipc::error::{err, fail, invalid, ok};
use crate::ipc::helpers::{get_str, optional_bool, optional_trimmed, string_list};
use crate::ipc::types::{AppState, Request};
use crate::source::{FixtureStudentSource, SqliteStudentSource, StudentSource};
use crate::student::{parse_birthday, StudentRecord};
use crate::table::{self, TableState, TableStateParams};
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match SqliteStudentSource::new(conn).fetch_all_students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => fail(&req.id, "db_query_failed", &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(id) = get_str(&req.params, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    match db::get_student(conn, id) {
        Ok(Some(student)) => ok(&req.id, json!({ "student": student })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => fail(&req.id, "db_query_failed", &e),
    }
}

fn handle_students_query(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let params: TableStateParams = if req.params.is_null() {
        TableStateParams::default()
    } else {
        match serde_json::from_value(req.params.clone()) {
            Ok(p) => p,
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        }
    };
    let settings = match RosterSettings::load(conn) {
        Ok(s) => s,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    let table_state = match TableState::resolve(params, settings.default_page_size) {
        Ok(s) => s,
        Err(e) => return invalid(&req.id, &e),
    };

    let records = match SqliteStudentSource::new(conn).fetch_all_students() {
        Ok(r) => r,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    let catalog = match db::load_catalog(conn) {
        Ok(c) => c,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };

    let result = table::run_query(&records, &table_state, &catalog);
    match serde_json::to_value(result) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let Some(name) = optional_trimmed(&req.params, "name") else {
        return invalid(&req.id, &ValidationError::EmptyField("name"));
    };
    let student_email = optional_trimmed(&req.params, "studentEmail").unwrap_or_default();
    let location = optional_trimmed(&req.params, "location").unwrap_or_default();
    let birthday = match parse_birthday(get_str(&req.params, "birthday").unwrap_or("")) {
        Ok(v) => v,
        Err(e) => return invalid(&req.id, &e),
    };
    let is_activated = match optional_bool(&req.params, "isActivated") {
        Ok(v) => v.unwrap_or(true),
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let settings = match RosterSettings::load(conn) {
        Ok(s) => s,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    let catalog = match db::load_catalog(conn) {
        Ok(c) => c,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    let (department_id, major_id) = match department_and_major(req, &settings, &catalog) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let major_name = catalog
        .major_name(department_id, major_id)
        .unwrap_or_default()
        .to_string();

    let year = settings.enrollment_year;
    let (dept, major) = (i64::from(department_id), i64::from(major_id));
    let class_code = match optional_trimmed(&req.params, "classCode") {
        Some(code) => match codes::require_offered_class_code(year, dept, major, &code) {
            Ok(()) => code,
            Err(e) => return invalid(&req.id, &e),
        },
        None => match codes::generate_class_code(
            year,
            dept,
            major,
            i64::from(settings.default_class_ordinal),
        ) {
            Ok(c) => c,
            Err(e) => return invalid(&req.id, &e),
        },
    };
    // "21050401" -> "<major> 2101"
    let class_name = format!("{} {}{}", major_name, &class_code[..2], &class_code[6..]);

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let student_id = match db::allocate_student_id(&tx, year, department_id) {
        Ok(v) => v,
        Err(e) => {
            let _ = tx.rollback();
            return fail(&req.id, "db_update_failed", &e);
        }
    };
    let ensured = match catalog.class_by_code(&class_code) {
        Some(existing) => Ok(existing.id),
        None => db::ensure_class(&tx, &class_code, &class_name),
    };
    let class_id = match ensured {
        Ok(v) => v,
        Err(e) => {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                format!("{e:#}"),
                Some(json!({ "table": "classes" })),
            );
        }
    };

    let record = StudentRecord {
        id: Uuid::new_v4().to_string(),
        student_id,
        name,
        student_email,
        location,
        birthday,
        department_id,
        major_id,
        class_id,
        is_activated,
    };
    if let Err(e) = db::insert_student(&tx, &record) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            format!("{e:#}"),
            Some(json!({ "table": "students" })),
        );
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(
        student_id = %record.student_id,
        class_code = %class_code,
        "student created"
    );
    ok(
        &req.id,
        json!({ "student": record, "classCode": class_code }),
    )
}

enum PatchError {
    BadParams(String),
    Invalid(ValidationError),
}

impl From<ValidationError> for PatchError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}

fn patch_str<'a>(k: &str, v: &'a Value) -> Result<&'a str, PatchError> {
    v.as_str()
        .ok_or_else(|| PatchError::BadParams(format!("{} must be string", k)))
}

fn apply_patch(
    student: &mut StudentRecord,
    patch: &serde_json::Map<String, Value>,
) -> Result<(), PatchError> {
    for (k, v) in patch {
        match k.as_str() {
            "name" => {
                let s = patch_str(k, v)?.trim();
                if s.is_empty() {
                    return Err(ValidationError::EmptyField("name").into());
                }
                student.name = s.to_string();
            }
            "studentEmail" => student.student_email = patch_str(k, v)?.trim().to_string(),
            "location" => student.location = patch_str(k, v)?.trim().to_string(),
            "birthday" => {
                student.birthday = if v.is_null() {
                    None
                } else {
                    parse_birthday(patch_str(k, v)?)?
                };
            }
            "isActivated" => {
                let Some(b) = v.as_bool() else {
                    return Err(PatchError::BadParams("isActivated must be boolean".into()));
                };
                student.is_activated = b;
            }
            "id" | "studentId" | "departmentId" | "majorId" | "classId" => {
                return Err(PatchError::BadParams(format!("{} is read-only", k)));
            }
            _ => return Err(PatchError::BadParams(format!("unknown student field: {}", k))),
        }
    }
    Ok(())
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(id) = get_str(&req.params, "id") else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut student = match db::get_student(conn, id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    match apply_patch(&mut student, patch) {
        Ok(()) => {}
        Err(PatchError::BadParams(msg)) => return err(&req.id, "bad_params", msg, None),
        Err(PatchError::Invalid(e)) => return invalid(&req.id, &e),
    }

    match db::update_student(conn, &student) {
        Ok(true) => ok(&req.id, json!({ "student": student })),
        Ok(false) => err(&req.id, "not_found", "student not found", None),
        Err(e) => fail(&req.id, "db_update_failed", &e),
    }
}

fn handle_students_bulk_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let ids = match string_list(&req.params, "ids") {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let records = match SqliteStudentSource::new(conn).fetch_all_students() {
        Ok(r) => r,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    let selected: HashSet<String> = ids.iter().cloned().collect();
    let remaining = table::bulk_delete(&records, &selected);

    let kept: HashSet<&str> = remaining.iter().map(|r| r.id.as_str()).collect();
    let removed: Vec<String> = records
        .iter()
        .filter(|r| !kept.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();
    let known: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let mut seen = HashSet::new();
    let not_found: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| !known.contains(id) && seen.insert(*id))
        .collect();

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    let deleted = match db::delete_students(&tx, &removed) {
        Ok(n) => n,
        Err(e) => {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                format!("{e:#}"),
                Some(json!({ "table": "students" })),
            );
        }
    };
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(deleted, not_found = not_found.len(), "students deleted");
    ok(
        &req.id,
        json!({
            "deleted": deleted,
            "notFound": not_found,
            "remainingCount": remaining.len(),
        }),
    )
}

fn handle_students_seed_demo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let fixture = match FixtureStudentSource::embedded().fetch_all_students() {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    let catalog = match db::load_catalog(conn) {
        Ok(c) => c,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    let mut inserted = 0usize;
    let mut skipped = 0usize;
    for s in &fixture {
        let fits_catalog =
            catalog.major(s.department_id, s.major_id).is_some() && catalog.class(s.class_id).is_some();
        let taken = match (
            db::get_student(&tx, &s.id),
            db::student_no_exists(&tx, &s.student_id),
        ) {
            (Ok(existing), Ok(no_taken)) => existing.is_some() || no_taken,
            (Err(e), _) | (_, Err(e)) => {
                let _ = tx.rollback();
                return fail(&req.id, "db_query_failed", &e);
            }
        };
        if !fits_catalog || taken {
            skipped += 1;
            continue;
        }
        if let Err(e) = db::insert_student(&tx, s) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                format!("{e:#}"),
                Some(json!({ "table": "students" })),
            );
        }
        inserted += 1;
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(inserted, skipped, "demo students seeded");
    ok(&req.id, json!({ "inserted": inserted, "skipped": skipped }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.query" => Some(handle_students_query(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.bulkDelete" => Some(handle_students_bulk_delete(state, req)),
        "students.seedDemo" => Some(handle_students_seed_demo(state, req)),
        _ => None,
    }
}
