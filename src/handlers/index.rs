use axum::{extract::State, response::Json};
use common::AppInfo;
use tracing::instrument;

use crate::schemas::AppState;

/// Service name and version
#[utoipa::path(
    get,
    path = "/",
    tag = "info",
    responses(
        (status = 200, description = "Service information", body = AppInfo)
    )
)]
#[instrument(skip(state))]
pub async fn info(State(state): State<AppState>) -> Json<AppInfo> {
    Json(AppInfo {
        name: state.settings.app.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
