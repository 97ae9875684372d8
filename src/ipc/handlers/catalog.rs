use crate::catalog::{Catalog, CatalogData};
use crate::db;
use crate::ipc::error::{err, fail, invalid, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn catalog_json(catalog: &Catalog) -> serde_json::Value {
    json!({
        "departments": catalog.departments().collect::<Vec<_>>(),
        "classes": catalog.classes().collect::<Vec<_>>(),
    })
}

fn handle_catalog_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::load_catalog(conn) {
        Ok(catalog) => ok(&req.id, catalog_json(&catalog)),
        Err(e) => fail(&req.id, "db_query_failed", &e),
    }
}

fn handle_catalog_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let data: CatalogData = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let catalog = match Catalog::from_data(data) {
        Ok(c) => c,
        Err(e) => return invalid(&req.id, &e),
    };
    if catalog.is_empty() {
        return err(&req.id, "bad_params", "catalog has no departments or classes", None);
    }

    let orphans = match db::count_orphans(conn, &catalog) {
        Ok(n) => n,
        Err(e) => return fail(&req.id, "db_query_failed", &e),
    };
    if orphans > 0 {
        return err(
            &req.id,
            "conflict",
            format!("catalog import would orphan {} students", orphans),
            Some(json!({ "orphans": orphans })),
        );
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = db::replace_catalog(&tx, &catalog) {
        let _ = tx.rollback();
        return fail(&req.id, "db_insert_failed", &e);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(
        departments = catalog.departments().count(),
        majors = catalog.major_count(),
        classes = catalog.classes().count(),
        "catalog imported"
    );
    ok(
        &req.id,
        json!({
            "departmentCount": catalog.departments().count(),
            "majorCount": catalog.major_count(),
            "classCount": catalog.classes().count(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "catalog.get" => Some(handle_catalog_get(state, req)),
        "catalog.import" => Some(handle_catalog_import(state, req)),
        _ => None,
    }
}
