use crate::config::RosterSettings;
use crate::db;
use crate::ipc::error::{err, fail, invalid, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

#[derive(Clone, Copy)]
enum SetupSection {
    Roster,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "roster" => Some(Self::Roster),
            _ => None,
        }
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let roster = match RosterSettings::load(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "roster": roster }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    match section {
        SetupSection::Roster => {
            let mut current = match RosterSettings::load(conn) {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            };
            if let Err(msg) = current.merge_patch(patch_obj) {
                return err(&req.id, "bad_params", msg, None);
            }
            // Defaults must still point at a real major.
            let catalog = match db::load_catalog(conn) {
                Ok(c) => c,
                Err(e) => return fail(&req.id, "db_query_failed", &e),
            };
            if let Err(e) =
                catalog.require_major(current.default_department_id, current.default_major_id)
            {
                return invalid(&req.id, &e);
            }
            if let Err(e) = current.save(conn) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            tracing::info!(section = section_raw, "setup updated");
        }
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
