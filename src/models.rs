use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::validation::{FieldErrors, Fields, Schema};

// --- Roles ---

/// Seeded role ids. Reference data, never written through the API.
pub const ADMIN_ROLE_ID: i32 = 1;
pub const POSTER_ROLE_ID: i32 = 2;

/// Users registered without a `role_id` get the lowest-privilege role.
pub const DEFAULT_ROLE_ID: i32 = POSTER_ROLE_ID;

/// Column widths in `migrations/0001_init.sql`.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_POST_BODY_LEN: usize = 1000;
pub const MAX_COMMENT_BODY_LEN: usize = 1050;

/// Role
///
/// A named authorization level from the `roles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i32,
    pub role_name: String,
}

// --- Users ---

/// User
///
/// The stored user row. `password` holds the bcrypt hash and never leaves the service:
/// this type is deliberately not `Serialize`; responses use [`UserView`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: i32,
}

/// UserView
///
/// Output variant of a user (single record and listings). Excludes the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserView {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub role_id: i32,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            role_id: user.role_id,
        }
    }
}

/// UserInput
///
/// Input variant for registration and update. `id` is tolerated and ignored;
/// `role_id` is only honoured at registration.
#[derive(Debug, Clone, ToSchema)]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: Option<i32>,
}

impl Schema for UserInput {
    fn load(value: &Value) -> Result<Self, FieldErrors> {
        let mut fields = Fields::new(
            value,
            &[
                "id",
                "first_name",
                "last_name",
                "username",
                "email",
                "password",
                "role_id",
            ],
        )?;
        fields.optional_integer("id");
        let first_name = fields.bounded_string("first_name", MAX_NAME_LEN);
        let last_name = fields.bounded_string("last_name", MAX_NAME_LEN);
        let username = fields.bounded_string("username", MAX_NAME_LEN);
        let email = fields.bounded_string("email", MAX_NAME_LEN);
        let password = fields.string("password");
        let role_id = fields.optional_integer("role_id");
        fields.finish()?;

        Ok(Self {
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
            role_id,
        })
    }
}

/// LoginInput
///
/// Narrow variant used only by `POST /token`: exactly username and password.
#[derive(Debug, Clone, ToSchema)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl Schema for LoginInput {
    fn load(value: &Value) -> Result<Self, FieldErrors> {
        let mut fields = Fields::new(value, &["username", "password"])?;
        let username = fields.string("username");
        let password = fields.string("password");
        fields.finish()?;

        Ok(Self {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

/// NewUser
///
/// A validated registration with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i32,
}

/// UserChanges
///
/// Full replacement of a user's writable fields. The role is not writable here.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// TokenResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

// --- Posts ---

/// Post
///
/// `user_id` is a loose association: it is not checked against the users table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub user_id: i32,
}

/// PostInput
///
/// Input variant for creating and replacing a post.
#[derive(Debug, Clone, ToSchema)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub user_id: i32,
}

impl Schema for PostInput {
    fn load(value: &Value) -> Result<Self, FieldErrors> {
        let mut fields = Fields::new(value, &["id", "title", "body", "user_id"])?;
        fields.optional_integer("id");
        let title = fields.bounded_string("title", MAX_TITLE_LEN);
        let body = fields.bounded_string("body", MAX_POST_BODY_LEN);
        let user_id = fields.integer("user_id");
        fields.finish()?;

        Ok(Self {
            title: title.unwrap_or_default(),
            body: body.unwrap_or_default(),
            user_id: user_id.unwrap_or_default(),
        })
    }
}

// --- Comments ---

/// Comment
///
/// `username` is copied from the request when the comment is written; renaming the
/// user later does not update it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub comment_body: String,
}

/// CommentInput
#[derive(Debug, Clone, ToSchema)]
pub struct CommentInput {
    pub user_id: i32,
    pub username: String,
    pub comment_body: String,
}

impl Schema for CommentInput {
    fn load(value: &Value) -> Result<Self, FieldErrors> {
        let mut fields = Fields::new(value, &["id", "user_id", "username", "comment_body"])?;
        fields.optional_integer("id");
        let user_id = fields.integer("user_id");
        let username = fields.bounded_string("username", MAX_NAME_LEN);
        let comment_body = fields.bounded_string("comment_body", MAX_COMMENT_BODY_LEN);
        fields.finish()?;

        Ok(Self {
            user_id: user_id.unwrap_or_default(),
            username: username.unwrap_or_default(),
            comment_body: comment_body.unwrap_or_default(),
        })
    }
}

// --- Shared responses ---

/// Message
///
/// Confirmation body for deletions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Message {
    pub message: String,
}
