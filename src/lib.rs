pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        // Login
        .route("/api/auth/otp/request", post(handlers::auth::request_otp))
        .route("/api/auth/otp/verify", post(handlers::auth::verify_otp))
        .route("/api/auth/session", get(handlers::auth::get_session))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Public intake
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/staff", post(handlers::staff::apply))
        .route("/api/users", post(handlers::users::register))
        // Admin
        .route("/api/admin/stats", get(handlers::dashboard::get_stats))
        .route("/api/admin/bookings", get(handlers::bookings::list_bookings))
        .route(
            "/api/admin/bookings/export.csv",
            get(handlers::bookings::export_bookings),
        )
        .route("/api/admin/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/admin/bookings/:id/approve",
            post(handlers::bookings::approve_booking),
        )
        .route(
            "/api/admin/bookings/:id/reject",
            post(handlers::bookings::reject_booking),
        )
        .route(
            "/api/admin/bookings/:id/payment",
            post(handlers::bookings::record_payment),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::bookings::complete_booking),
        )
        .route("/api/admin/staff", get(handlers::staff::list_staff))
        .route("/api/admin/staff/export.csv", get(handlers::staff::export_staff))
        .route("/api/admin/staff/:id", get(handlers::staff::get_staff))
        .route("/api/admin/staff/:id/approve", post(handlers::staff::approve))
        .route("/api/admin/staff/:id/reject", post(handlers::staff::reject))
        .route("/api/admin/staff/:id/suspend", post(handlers::staff::suspend))
        .route("/api/admin/staff/:id/reinstate", post(handlers::staff::reinstate))
        .route("/api/admin/staff/:id/role", post(handlers::staff::change_role))
        .route("/api/admin/users", get(handlers::users::list_users))
        .route("/api/admin/users/:id", get(handlers::users::get_user))
        .route("/api/admin/users/:id/block", post(handlers::users::block_user))
        .route(
            "/api/admin/users/:id/unblock",
            post(handlers::users::unblock_user),
        )
        // Email
        .route("/api/email/send", post(handlers::email::send_email))
        .route(
            "/api/email/bookings/:id/notify",
            post(handlers::email::notify_booking),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
