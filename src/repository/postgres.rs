use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepoResult, Repository};
use crate::{
    models::{Comment, CommentInput, NewUser, Post, PostInput, Role, User, UserChanges},
    validation::Page,
};

/// PostgresRepository
///
/// The production `Repository`, backed by a sqlx connection pool. Each method is one
/// statement, so single-row writes are atomic; concurrent updates are last-write-wins.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// LIKE pattern matching `term` literally anywhere in the column. Pairs with `ESCAPE '\'`.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, username, email, password, role_id
               FROM users ORDER BY id LIMIT $1 OFFSET $2"#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn search_users_by_username(&self, term: &str, page: Page) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, username, email, password, role_id
               FROM users WHERE username LIKE $1 ESCAPE '\' ORDER BY id LIMIT $2 OFFSET $3"#,
        )
        .bind(contains_pattern(term))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, username, email, password, role_id
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, username, email, password, role_id
               FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, username, email, password, role_id
               FROM users WHERE username = $1 OR email = $2 ORDER BY id"#,
        )
        .bind(username)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (first_name, last_name, username, email, password, role_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, first_name, last_name, username, email, password, role_id"#,
        )
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET first_name = $2, last_name = $3, username = $4, email = $5, password = $6
               WHERE id = $1
               RETURNING id, first_name, last_name, username, email, password, role_id"#,
        )
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_role(&self, id: i32) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, role_name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn list_posts(&self, page: Page) -> RepoResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT id, title, body, user_id FROM posts ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// The integer column is cast to text so a term like `"1"` also matches user 12.
    async fn search_posts_by_user_id(&self, term: &str, page: Page) -> RepoResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"SELECT id, title, body, user_id FROM posts
               WHERE CAST(user_id AS TEXT) LIKE $1 ESCAPE '\' ORDER BY id LIMIT $2 OFFSET $3"#,
        )
        .bind(contains_pattern(term))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i32) -> RepoResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT id, title, body, user_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn create_post(&self, post: &PostInput) -> RepoResult<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"INSERT INTO posts (title, body, user_id) VALUES ($1, $2, $3)
               RETURNING id, title, body, user_id"#,
        )
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_post(&self, id: i32, post: &PostInput) -> RepoResult<Option<Post>> {
        let updated = sqlx::query_as::<_, Post>(
            r#"UPDATE posts SET title = $2, body = $3, user_id = $4 WHERE id = $1
               RETURNING id, title, body, user_id"#,
        )
        .bind(id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_post(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, page: Page) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"SELECT id, user_id, username, comment_body FROM comments
               ORDER BY id LIMIT $1 OFFSET $2"#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn search_comments_by_username(
        &self,
        term: &str,
        page: Page,
    ) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"SELECT id, user_id, username, comment_body FROM comments
               WHERE username LIKE $1 ESCAPE '\' ORDER BY id LIMIT $2 OFFSET $3"#,
        )
        .bind(contains_pattern(term))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, id: i32) -> RepoResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, user_id, username, comment_body FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(&self, comment: &CommentInput) -> RepoResult<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (user_id, username, comment_body) VALUES ($1, $2, $3)
               RETURNING id, user_id, username, comment_body"#,
        )
        .bind(comment.user_id)
        .bind(&comment.username)
        .bind(&comment.comment_body)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_comment(
        &self,
        id: i32,
        comment: &CommentInput,
    ) -> RepoResult<Option<Comment>> {
        let updated = sqlx::query_as::<_, Comment>(
            r#"UPDATE comments SET user_id = $2, username = $3, comment_body = $4 WHERE id = $1
               RETURNING id, user_id, username, comment_body"#,
        )
        .bind(id)
        .bind(comment.user_id)
        .bind(&comment.username)
        .bind(&comment.comment_body)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_comment(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
