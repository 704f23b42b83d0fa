use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    admin, auth, booking, brand, dashboard, event, health_check, notification, ticket, upload, venue,
    whatsapp,
};
use crate::state::AppState;

// Headroom for multipart boundaries and part headers around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me).put(auth::update_me))
}

fn venue_routes() -> Router<AppState> {
    Router::new()
        .route("/venues", get(venue::list_venues).post(venue::create_venue))
        .route(
            "/venues/:id",
            get(venue::get_venue)
                .put(venue::update_venue)
                .delete(venue::delete_venue),
        )
        .route("/venues/:id/slots", post(venue::add_slot))
        .route("/venues/:id/slots/:slot_id", delete(venue::delete_slot))
        .route("/venues/:id/bookings", post(booking::create_booking))
        .route("/bookings", get(booking::my_bookings))
        .route("/bookings/:id/cancel", put(booking::cancel_booking))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(event::list_events).post(event::create_event))
        .route("/events/mine", get(event::my_events))
        .route("/events/venue-requests", get(event::venue_requests))
        .route(
            "/events/:id",
            get(event::get_event)
                .put(event::update_event)
                .delete(event::delete_event),
        )
        .route("/events/:id/venue-approval", put(event::venue_approval))
        .route("/events/:id/cancel", put(event::cancel_event))
        .route("/events/:id/access", post(event::request_access))
        .route("/events/:id/checkin-stats", get(event::checkin_stats))
        .route("/tickets", get(ticket::my_tickets))
        .route("/tickets/purchase", post(ticket::purchase))
        .route("/tickets/scan", post(ticket::scan))
        .route("/tickets/:id", get(ticket::get_ticket))
        .route("/tickets/:id/qr", get(ticket::ticket_qr))
}

fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/brands", get(brand::list_brands))
        .route(
            "/brands/verification",
            get(brand::my_requests).post(brand::apply),
        )
        .route("/brands/me", put(brand::update_my_brand))
        .route("/brands/me/posts", post(brand::create_post))
        .route("/brands/:id", get(brand::get_brand))
        .route("/brands/:id/posts", get(brand::list_posts))
        .route("/posts/:id", delete(brand::delete_post))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(notification::list))
        .route("/notifications/read-all", put(notification::mark_all_read))
        .route("/notifications/:id/read", put(notification::mark_read))
        .route("/dashboard/summary", get(dashboard::summary))
        .route("/dashboard/bookings", get(dashboard::bookings))
        .route("/dashboard/payments", get(dashboard::payments))
        .route("/dashboard/payouts", get(dashboard::payouts))
        .route("/dashboard/venues", get(dashboard::venues))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/active", put(admin::set_user_active))
        .route("/admin/venues/pending", get(admin::pending_venues))
        .route("/admin/venues/:id/approval", put(admin::review_venue))
        .route("/admin/events/pending", get(admin::pending_events))
        .route("/admin/events/:id/approval", put(admin::review_event))
        .route("/admin/verifications", get(admin::list_verifications))
        .route("/admin/verifications/:id", put(admin::review_verification))
        .route(
            "/admin/payouts",
            get(admin::list_payouts).post(admin::create_payout),
        )
        .route("/admin/payouts/:id/paid", put(admin::mark_payout_paid))
}

/// `POST /uploads` stores a file, anything else under the prefix is served from disk.
fn upload_routes(dir: &Path, limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(upload::upload).layer(DefaultBodyLimit::max(limit)))
        .fallback_service(ServeDir::new(dir))
}

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();
    let upload_limit = config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(venue_routes())
        .merge(event_routes())
        .merge(brand_routes())
        .merge(account_routes())
        .merge(admin_routes())
        .nest("/uploads", upload_routes(&config.upload_dir, upload_limit))
        .route(
            "/webhooks/whatsapp",
            get(whatsapp::verify).post(whatsapp::receive),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&config))
        .layer(create_cors_layer(&config))
}
