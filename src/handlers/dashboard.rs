use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::check_auth;
use crate::db::queries::{self, DashboardStats};
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, AppError> {
    check_auth(&headers, &state)?;
    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_dashboard_stats(&db)?
    };
    Ok(Json(stats))
}
