use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{Message, Post, PostInput},
    validation::{PageParams, SearchParams, ValidJson, ValidPath},
};

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Post with Id {id} not found"))
}

#[utoipa::path(
    get,
    path = "/posts",
    params(PageParams),
    responses((status = 200, description = "Page of posts", body = [Post])),
    tag = "posts"
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.list_posts(params.page()?).await?))
}

/// search_posts
///
/// [Public Route] Posts whose `user_id`, written out in decimal, contains `search`.
/// `search=1` therefore matches users 1, 10, 21 and so on.
#[utoipa::path(
    get,
    path = "/posts/by_user_id",
    params(SearchParams),
    responses((status = 200, description = "Matching posts", body = [Post])),
    tag = "posts"
)]
pub async fn search_posts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state
        .repo
        .search_posts_by_user_id(params.term(), params.page()?)
        .await?;
    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "No such post", body = ErrorBody)
    ),
    tag = "posts"
)]
pub async fn get_post(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Post>, ApiError> {
    let post = state.repo.get_post(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(post))
}

/// create_post
///
/// [Poster Route] `user_id` is taken from the body as given; it is not tied to the caller.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = PostInput,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Poster role required", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PostInput>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    tracing::info!(user = %user.username, "creating a new post");
    let post = state.repo.create_post(&input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = PostInput,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Poster role required", body = ErrorBody),
        (status = 404, description = "No such post", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn update_post(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
    ValidJson(input): ValidJson<PostInput>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .repo
        .update_post(id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(post))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = Message),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Admin role required", body = ErrorBody),
        (status = 404, description = "No such post", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn delete_post(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    if !state.repo.delete_post(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(Message {
        message: format!("Post with Id {id} deleted successfully"),
    }))
}
