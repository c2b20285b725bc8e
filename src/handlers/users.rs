use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{ApiError, ErrorBody},
    models::{DEFAULT_ROLE_ID, Message, NewUser, UserChanges, UserInput, UserView},
    password::hash_password,
    validation::{PageParams, SearchParams, ValidJson, ValidPath},
};

const DUPLICATE_USER: &str = "User with that username and/or email already exist";

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("User with Id {id} not found"))
}

/// list_users
///
/// [Public Route] One page of users in id order, without passwords.
#[utoipa::path(
    get,
    path = "/users",
    params(PageParams),
    responses((status = 200, description = "Page of users", body = [UserView])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.repo.list_users(params.page()?).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// search_users
///
/// [Public Route] Users whose username contains `search`.
#[utoipa::path(
    get,
    path = "/users/username",
    params(SearchParams),
    responses((status = 200, description = "Matching users", body = [UserView])),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state
        .repo
        .search_users_by_username(params.term(), params.page()?)
        .await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// get_user
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<UserView>, ApiError> {
    let user = state.repo.get_user(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(user.into()))
}

/// create_user
///
/// [Public Route] Registration. Rejects the request if the username OR the email is
/// already taken. `role_id` is optional and defaults to the Poster role.
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserInput,
    responses(
        (status = 201, description = "Created", body = UserView),
        (status = 400, description = "Invalid body, duplicate user or unknown role", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<UserInput>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let existing = state
        .repo
        .find_users_by_username_or_email(&input.username, &input.email)
        .await?;
    if !existing.is_empty() {
        return Err(ApiError::Conflict(DUPLICATE_USER.to_string()));
    }

    let role_id = match input.role_id {
        Some(role_id) => {
            if state.repo.get_role(role_id).await?.is_none() {
                return Err(ApiError::BadRequest(format!(
                    "Role with ID {role_id} does not exist"
                )));
            }
            role_id
        }
        None => DEFAULT_ROLE_ID,
    };

    let password_hash = hash_password(input.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            first_name: input.first_name,
            last_name: input.last_name,
            username: input.username,
            email: input.email,
            password_hash,
            role_id,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// update_user
///
/// [Poster Route] Full replacement of a user's writable fields. The password is
/// re-hashed on every call, even when unchanged. The role is left as is.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UserInput,
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 400, description = "Invalid body or duplicate user", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Poster role required", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
    ValidJson(input): ValidJson<UserInput>,
) -> Result<Json<UserView>, ApiError> {
    if state.repo.get_user(id).await?.is_none() {
        return Err(not_found(id));
    }

    let clash = state
        .repo
        .find_users_by_username_or_email(&input.username, &input.email)
        .await?
        .into_iter()
        .any(|other| other.id != id);
    if clash {
        return Err(ApiError::Conflict(DUPLICATE_USER.to_string()));
    }

    let password_hash = hash_password(input.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .update_user(
            id,
            UserChanges {
                first_name: input.first_name,
                last_name: input.last_name,
                username: input.username,
                email: input.email,
                password_hash,
            },
        )
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(user.into()))
}

/// delete_user
///
/// [Admin Route]
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = Message),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    if !state.repo.delete_user(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(Message {
        message: format!("User with Id {id} deleted successfully"),
    }))
}
