use crate::catalog::Catalog;
use crate::codes;
use crate::config::RosterSettings;
use crate::db;
use crate::ipc::error::{err, fail, invalid, ok};
use crate::ipc::helpers::optional_i64;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Department and major from params (falling back to the roster defaults),
/// checked against the catalog. Errors come back as ready-made responses.
pub(super) fn department_and_major(
    req: &Request,
    settings: &RosterSettings,
    catalog: &Catalog,
) -> Result<(u8, u8), serde_json::Value> {
    let raw_department = optional_i64(&req.params, "departmentId")
        .map_err(|m| err(&req.id, "bad_params", m, None))?
        .unwrap_or(i64::from(settings.default_department_id));
    let raw_major = optional_i64(&req.params, "majorId")
        .map_err(|m| err(&req.id, "bad_params", m, None))?
        .unwrap_or(i64::from(settings.default_major_id));

    let department_id = codes::check_two_digit("departmentId", raw_department)
        .map_err(|e| invalid(&req.id, &e))?;
    let major_id =
        codes::check_two_digit("majorId", raw_major).map_err(|e| invalid(&req.id, &e))?;
    catalog
        .require_major(department_id, major_id)
        .map_err(|e| invalid(&req.id, &e))?;
    Ok((department_id, major_id))
}

fn handle_codes_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
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

    let year = settings.enrollment_year;
    let (student_id, next_sequence) =
        match db::next_free_student_id(conn, year, department_id) {
            Ok(v) => v,
            Err(e) => return fail(&req.id, "db_query_failed", &e),
        };
    let class_code = match codes::generate_class_code(
        year,
        i64::from(department_id),
        i64::from(major_id),
        i64::from(settings.default_class_ordinal),
    ) {
        Ok(c) => c,
        Err(e) => return invalid(&req.id, &e),
    };
    let class_options =
        match codes::class_code_options(year, i64::from(department_id), i64::from(major_id)) {
            Ok(v) => v,
            Err(e) => return invalid(&req.id, &e),
        };

    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "classCode": class_code,
            "classOptions": class_options,
            "enrollmentYear": year,
            "departmentId": department_id,
            "majorId": major_id,
            "nextSequence": next_sequence,
        }),
    )
}

fn handle_codes_class_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
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

    match codes::class_code_options(
        settings.enrollment_year,
        i64::from(department_id),
        i64::from(major_id),
    ) {
        Ok(options) => ok(&req.id, json!({ "classOptions": options })),
        Err(e) => invalid(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "codes.preview" => Some(handle_codes_preview(state, req)),
        "codes.classOptions" => Some(handle_codes_class_options(state, req)),
        _ => None,
    }
}
