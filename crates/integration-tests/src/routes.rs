//! A small HR route table covering every route group.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use server::{Identity, Role, Routes};

/// - `GET /public/holidays`: public
/// - `GET /public/panic`: public, always panics
/// - `GET /api/me`: any authenticated role, echoes the identity
/// - `GET /api/approvals`: admins and managers
/// - `GET /api/admin/payroll`: admins only
pub fn test_routes() -> Routes {
    Routes::new()
        .public(
            Router::new()
                .route("/public/holidays", get(holidays))
                .route("/public/panic", get(panicking)),
        )
        .authenticated(Router::new().route("/api/me", get(whoami)))
        .restricted(
            [Role::Admin, Role::Manager],
            Router::new().route("/api/approvals", get(approvals)),
        )
        .restricted([Role::Admin], Router::new().route("/api/admin/payroll", get(payroll)))
}

async fn holidays() -> Json<Value> {
    Json(json!(["2026-12-25", "2027-01-01"]))
}

async fn panicking() -> &'static str {
    panic!("attendance ledger is corrupt")
}

async fn whoami(identity: Identity) -> Json<Value> {
    Json(json!({ "subject": identity.subject, "role": identity.role }))
}

async fn approvals(identity: Identity) -> Json<Value> {
    Json(json!({ "pending": 3, "approver": identity.subject }))
}

async fn payroll() -> &'static str {
    "payroll"
}
