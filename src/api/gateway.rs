//! Signed gateway endpoints
//!
//! Every route here sits behind the signed-request middleware, so handlers
//! only ever see authenticated enterprises.

use axum::{
    routing::{get, post},
    Json, Router,
};

use crate::{
    models::{EnterpriseIdentity, IdentitySummary},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verify", post(verify))
        .route("/whoami", get(whoami))
}

/// Echo the caller's identity so tenants can check their signing code
async fn verify(identity: EnterpriseIdentity) -> Json<IdentitySummary> {
    Json(IdentitySummary::from(&identity))
}

async fn whoami(identity: EnterpriseIdentity) -> Json<IdentitySummary> {
    Json(IdentitySummary::from(&identity))
}
