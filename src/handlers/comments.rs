use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{Comment, CommentInput, Message},
    validation::{PageParams, SearchParams, ValidJson, ValidPath},
};

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Comment with Id {id} not found"))
}

#[utoipa::path(
    get,
    path = "/comments",
    params(PageParams),
    responses((status = 200, description = "Page of comments", body = [Comment])),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repo.list_comments(params.page()?).await?))
}

/// search_comments
///
/// [Public Route] Matches against the username stored on the comment, which may be
/// stale if the user has since been renamed.
#[utoipa::path(
    get,
    path = "/comments/username",
    params(SearchParams),
    responses((status = 200, description = "Matching comments", body = [Comment])),
    tag = "comments"
)]
pub async fn search_comments(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = state
        .repo
        .search_comments_by_username(params.term(), params.page()?)
        .await?;
    Ok(Json(comments))
}

#[utoipa::path(
    get,
    path = "/comments/{id}",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = Comment),
        (status = 404, description = "No such comment", body = ErrorBody)
    ),
    tag = "comments"
)]
pub async fn get_comment(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(comment))
}

#[utoipa::path(
    post,
    path = "/comments",
    request_body = CommentInput,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Poster role required", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    tracing::info!(user = %user.username, "creating a new comment");
    let comment = state.repo.create_comment(&input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = CommentInput,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Poster role required", body = ErrorBody),
        (status = 404, description = "No such comment", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
    ValidJson(input): ValidJson<CommentInput>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .repo
        .update_comment(id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = Message),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody),
        (status = 404, description = "No such comment", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    if !state.repo.delete_comment(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(Message {
        message: format!("Comment with Id {id} deleted successfully"),
    }))
}
