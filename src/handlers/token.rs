use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{ApiError, ErrorBody},
    models::{LoginInput, TokenResponse},
    password::verify_password,
    validation::ValidJson,
};

/// issue_token
///
/// [Public Route] Exchanges a username and password for a bearer token.
/// An unknown username and a wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/token",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed or invalid body"),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn issue_token(
    State(state): State<AppState>,
    ValidJson(credentials): ValidJson<LoginInput>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(user) = state
        .repo
        .get_user_by_username(&credentials.username)
        .await?
    else {
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(credentials.password, user.password).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    tracing::info!(user_id = user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}
