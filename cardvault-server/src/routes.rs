//! Router assembly with method fallbacks, CORS and tracing layers

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::method_not_allowed;
use crate::handlers;
use crate::openapi::openapi_json;
use crate::state::AppState;

/// Answer unsupported methods with a JSON 405 and an `Allow` header
fn only(route: MethodRouter<AppState>, allowed: &'static [Method]) -> MethodRouter<AppState> {
    route.fallback(move |method: Method| async move { method_not_allowed(&method, allowed) })
}

const COLLECTION: &[Method] = &[Method::GET, Method::POST];
const ITEM: &[Method] = &[Method::GET, Method::PUT, Method::DELETE];

fn resources() -> Router<AppState> {
    Router::new()
        .route(
            "/cards",
            only(get(handlers::list_cards).post(handlers::create_card), COLLECTION),
        )
        .route(
            "/cards/{id}",
            only(
                get(handlers::get_card)
                    .put(handlers::update_card)
                    .delete(handlers::delete_card),
                ITEM,
            ),
        )
        .route(
            "/users",
            only(get(handlers::list_users).post(handlers::create_user), COLLECTION),
        )
        .route(
            "/users/{id}",
            only(
                get(handlers::get_user)
                    .put(handlers::update_user)
                    .delete(handlers::delete_user),
                ITEM,
            ),
        )
}

/// Build the application router
///
/// Resource routes are served both at the root and under `/api`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(openapi_json))
        .merge(resources())
        .nest("/api", resources())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
