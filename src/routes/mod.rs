//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One JSON API under `/api` serves both the mobile app (bearer tokens) and
//! the admin web panel (session cookie). CORS is permissive because both
//! clients live on other origins; responses are gzip-compressed and every
//! request is traced.

pub mod auth;
pub mod catalog;
pub mod matches;
pub mod notifications;
pub mod promos;
pub mod settings;
pub mod users;
pub mod wallet;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        // own account
        .route("/api/me", get(users::my_profile).patch(users::update_my_profile))
        .route("/api/me/matches", get(matches::my_matches))
        .route("/api/me/referrals", get(users::referral_summary))
        .route("/api/me/referrals/claim", post(users::claim_referral_reward))
        .route("/api/leaderboard", get(users::leaderboard))
        // users (staff)
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}", get(users::get_user).delete(users::delete_user))
        .route("/api/users/{id}/role", put(users::set_role))
        .route("/api/users/{id}/ban", put(users::set_banned))
        .route("/api/users/{id}/adjust", post(users::adjust_balance))
        // wallet
        .route("/api/wallet", get(wallet::summary))
        .route("/api/wallet/transactions", get(wallet::transactions))
        .route("/api/wallet/deposits", post(wallet::request_deposit))
        .route("/api/wallet/withdrawals", post(wallet::request_withdrawal))
        .route("/api/admin/transactions/pending", get(wallet::list_pending))
        .route("/api/admin/deposits/{id}/approve", post(wallet::approve_deposit))
        .route("/api/admin/deposits/{id}/reject", post(wallet::reject_deposit))
        .route("/api/admin/withdrawals/{id}/approve", post(wallet::approve_withdrawal))
        .route("/api/admin/withdrawals/{id}/reject", post(wallet::reject_withdrawal))
        // matches + results
        .route("/api/matches", get(matches::list_matches).post(matches::create_match))
        .route(
            "/api/matches/{id}",
            get(matches::get_match)
                .patch(matches::update_match)
                .delete(matches::delete_match),
        )
        .route("/api/matches/{id}/type", put(matches::set_type))
        .route("/api/matches/{id}/room", put(matches::set_room))
        .route("/api/matches/{id}/cancel", post(matches::cancel_match))
        .route("/api/matches/{id}/players", get(matches::list_players))
        .route("/api/matches/{id}/join", post(matches::join_match))
        .route("/api/matches/{id}/leave", post(matches::leave_match))
        .route("/api/matches/{id}/results", get(matches::get_results).put(matches::submit_results))
        .route("/api/matches/{id}/distribute", post(matches::distribute))
        .route("/api/matches/{id}/reverse", post(matches::reverse))
        // promo codes
        .route("/api/promos", get(promos::list_promos).post(promos::create_promo))
        .route("/api/promos/redeem", post(promos::redeem))
        .route("/api/promos/{code}", delete(promos::delete_promo).patch(promos::set_active))
        // notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        .route("/api/admin/notifications", post(notifications::send))
        // catalog
        .route("/api/promotions", get(catalog::list_promotions).post(catalog::create_promotion))
        .route(
            "/api/promotions/{id}",
            put(catalog::update_promotion).delete(catalog::delete_promotion),
        )
        .route("/api/ads", get(catalog::list_ads).post(catalog::create_ad))
        .route("/api/ads/{id}", put(catalog::update_ad).delete(catalog::delete_ad))
        .route(
            "/api/payment-methods",
            get(catalog::list_payment_methods).post(catalog::create_payment_method),
        )
        .route(
            "/api/payment-methods/{id}",
            put(catalog::update_payment_method).delete(catalog::delete_payment_method),
        )
        // settings
        .route("/api/settings", get(settings::get_settings).patch(settings::update_settings))
        .route("/api/settings/banner-lines", post(settings::add_banner_line))
        .route("/api/settings/banner-lines/{index}", delete(settings::remove_banner_line))
}

/// Full application router with middleware.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes()
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
