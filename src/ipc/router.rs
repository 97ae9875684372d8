use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::catalog::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::codes::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    let resp = dispatch(state, &req);
    if let Some(error) = resp.get("error") {
        tracing::warn!(
            id = %req.id,
            method = %req.method,
            code = error.get("code").and_then(|v| v.as_str()).unwrap_or(""),
            message = error.get("message").and_then(|v| v.as_str()).unwrap_or(""),
            "request failed"
        );
    }
    resp
}
