//! Request handlers for the card and user endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use utoipa::IntoParams;

use cardvault_core::{
    CardDetails, CardPatch, CardQuery, Deleted, Entity, ErrorBody, NewCard, NewUser, UserDetails,
    UserPatch,
};

use crate::error::ApiError;
use crate::state::AppState;

/// `include` values that expand the related records
fn includes(include: Option<&str>, relation: &str) -> bool {
    matches!(include, Some(value) if value == relation || value == "true")
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CardListParams {
    /// Only cards owned by this user
    pub user_id: Option<String>,
    /// `user` or `true` to embed each card's owner
    pub include: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncludeParams {
    /// `user`/`cards` (or `true`) to embed the related records
    pub include: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Server is up"))
)]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "backend": state.store.backend() }))
}

// === Cards ===

#[utoipa::path(
    get,
    path = "/cards",
    tag = "cards",
    params(CardListParams),
    responses((status = 200, description = "Cards, newest first", body = [CardDetails]))
)]
pub async fn list_cards(
    State(state): State<AppState>,
    Query(params): Query<CardListParams>,
) -> Result<Json<Vec<CardDetails>>, ApiError> {
    let query = CardQuery {
        user_id: params.user_id,
        include_owner: includes(params.include.as_deref(), "user"),
    };
    Ok(Json(state.store.list_cards(&query).await?))
}

#[utoipa::path(
    post,
    path = "/cards",
    tag = "cards",
    request_body = NewCard,
    responses(
        (status = 201, description = "Card created", body = CardDetails),
        (status = 400, description = "Missing fields or bad expiry", body = ErrorBody),
        (status = 404, description = "Owner not found", body = ErrorBody)
    )
)]
pub async fn create_card(
    State(state): State<AppState>,
    payload: Result<Json<NewCard>, JsonRejection>,
) -> Result<(StatusCode, Json<CardDetails>), ApiError> {
    let Json(card) = payload?;
    let result = state.store.create_card(card).await;
    state.track(&result, "card_create", Entity::Card, "POST /cards", |c| c.card.id.clone());

    let card = result?;
    info!(card_id = %card.card.id, "Card created");
    Ok((StatusCode::CREATED, Json(card)))
}

#[utoipa::path(
    get,
    path = "/cards/{id}",
    tag = "cards",
    params(("id" = String, Path, description = "Card id"), IncludeParams),
    responses(
        (status = 200, body = CardDetails),
        (status = 404, description = "Card not found", body = ErrorBody)
    )
)]
pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<IncludeParams>,
) -> Result<Json<CardDetails>, ApiError> {
    let include_owner = includes(params.include.as_deref(), "user");
    Ok(Json(state.store.get_card(&id, include_owner).await?))
}

#[utoipa::path(
    put,
    path = "/cards/{id}",
    tag = "cards",
    params(("id" = String, Path, description = "Card id")),
    request_body = CardPatch,
    responses(
        (status = 200, body = CardDetails),
        (status = 400, description = "Bad expiry", body = ErrorBody),
        (status = 404, description = "Card or owner not found", body = ErrorBody)
    )
)]
pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<CardDetails>, ApiError> {
    let Json(patch) = payload?;
    let result = state.store.update_card(&id, patch).await;
    state.track(&result, "card_update", Entity::Card, "PUT /cards/{id}", |c| c.card.id.clone());
    Ok(Json(result?))
}

#[utoipa::path(
    delete,
    path = "/cards/{id}",
    tag = "cards",
    params(("id" = String, Path, description = "Card id")),
    responses(
        (status = 200, body = Deleted),
        (status = 404, description = "Card not found", body = ErrorBody)
    )
)]
pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let result = state.store.delete_card(&id).await;
    state.track(&result, "card_delete", Entity::Card, "DELETE /cards/{id}", |d| d.id.clone());
    Ok(Json(result?))
}

// === Users ===

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(IncludeParams),
    responses((status = 200, description = "Users, newest first", body = [UserDetails]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<IncludeParams>,
) -> Result<Json<Vec<UserDetails>>, ApiError> {
    let include_cards = includes(params.include.as_deref(), "cards");
    Ok(Json(state.store.list_users(include_cards).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = UserDetails),
        (status = 400, description = "Email missing", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<UserDetails>), ApiError> {
    let Json(user) = payload?;
    let result = state.store.create_user(user).await;
    state.track(&result, "user_create", Entity::User, "POST /users", |u| u.user.id.clone());

    let user = result?;
    info!(user_id = %user.user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id"), IncludeParams),
    responses(
        (status = 200, body = UserDetails),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<IncludeParams>,
) -> Result<Json<UserDetails>, ApiError> {
    let include_cards = includes(params.include.as_deref(), "cards");
    Ok(Json(state.store.get_user(&id, include_cards).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UserPatch,
    responses(
        (status = 200, body = UserDetails),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 409, description = "Email taken", body = ErrorBody)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserDetails>, ApiError> {
    let Json(patch) = payload?;
    let result = state.store.update_user(&id, patch).await;
    state.track(&result, "user_update", Entity::User, "PUT /users/{id}", |u| u.user.id.clone());
    Ok(Json(result?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User and their cards deleted", body = Deleted),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let result = state.store.delete_user(&id).await;
    state.track(&result, "user_delete", Entity::User, "DELETE /users/{id}", |d| d.id.clone());
    Ok(Json(result?))
}
