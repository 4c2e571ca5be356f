//! A minimal route table to exercise the admission pipeline.
//!
//! The HR business modules mount their own routers the same way.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use server::{Identity, Role, Routes};

#[derive(Serialize)]
struct WhoAmI {
    subject: String,
    role: Role,
}

async fn whoami(identity: Identity) -> Json<WhoAmI> {
    Json(WhoAmI {
        subject: identity.subject,
        role: identity.role,
    })
}

async fn admin_ping() -> &'static str {
    "pong"
}

pub(crate) fn routes() -> Routes {
    Routes::new()
        .authenticated(Router::new().route("/api/me", get(whoami)))
        .restricted([Role::Admin], Router::new().route("/api/admin/ping", get(admin_ping)))
}
