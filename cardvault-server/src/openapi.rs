//! OpenAPI document for the REST API

use axum::Json;
use utoipa::OpenApi;

use cardvault_core::{
    CardDetails, CardPatch, CreditCard, Deleted, ErrorBody, NewCard, NewUser, User, UserDetails,
    UserPatch,
};

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(title = "CardVault API", description = "Credit card and user records"),
    paths(
        handlers::health,
        handlers::list_cards,
        handlers::create_card,
        handlers::get_card,
        handlers::update_card,
        handlers::delete_card,
        handlers::list_users,
        handlers::create_user,
        handlers::get_user,
        handlers::update_user,
        handlers::delete_user,
    ),
    components(schemas(
        CreditCard,
        CardDetails,
        NewCard,
        CardPatch,
        User,
        UserDetails,
        NewUser,
        UserPatch,
        Deleted,
        ErrorBody,
    )),
    tags(
        (name = "cards", description = "Credit card records"),
        (name = "users", description = "Card owners"),
        (name = "system", description = "Server status")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_resources() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/cards", "/cards/{id}", "/users", "/users/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
