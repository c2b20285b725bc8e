use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    models::{
        ADMIN_ROLE_ID, Comment, CommentInput, NewUser, POSTER_ROLE_ID, Post, PostInput, Role,
        User, UserChanges,
    },
    validation::Page,
};

/// MemoryRepository
///
/// An in-process `Repository` with the same observable semantics as the Postgres store:
/// seeded roles, generated ids starting at 1, insertion (id) order, unique usernames and
/// emails. Used by the test suites and for running the API without a database.
pub struct MemoryRepository {
    roles: Vec<Role>,
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    last_user_id: i32,
    last_post_id: i32,
    last_comment_id: i32,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            roles: vec![
                Role {
                    id: ADMIN_ROLE_ID,
                    role_name: "Admin".to_string(),
                },
                Role {
                    id: POSTER_ROLE_ID,
                    role_name: "Poster".to_string(),
                },
            ],
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn paginate<'a, T: Clone + 'a>(rows: impl Iterator<Item = &'a T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.skip(offset).take(limit).cloned().collect()
}

fn ensure_unique(users: &[User], id: Option<i32>, username: &str, email: &str) -> RepoResult<()> {
    let clash = users
        .iter()
        .filter(|user| Some(user.id) != id)
        .any(|user| user.username == username || user.email == email);
    if clash {
        return Err(RepositoryError::UniqueViolation(
            "users.username or users.email".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.users.iter(), page))
    }

    async fn search_users_by_username(&self, term: &str, page: Page) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        let matches = tables.users.iter().filter(|user| user.username.contains(term));
        Ok(paginate(matches, page))
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|user| user.username == username || user.email == email)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        ensure_unique(&tables.users, None, &user.username, &user.email)?;

        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password: user.password_hash,
            role_id: user.role_id,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut tables = self.tables.write().await;
        ensure_unique(&tables.users, Some(id), &changes.username, &changes.email)?;

        let Some(user) = tables.users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        user.username = changes.username;
        user.email = changes.email;
        user.password = changes.password_hash;
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|user| user.id != id);
        Ok(tables.users.len() < before)
    }

    async fn get_role(&self, id: i32) -> RepoResult<Option<Role>> {
        Ok(self.roles.iter().find(|role| role.id == id).cloned())
    }

    async fn list_posts(&self, page: Page) -> RepoResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.posts.iter(), page))
    }

    async fn search_posts_by_user_id(&self, term: &str, page: Page) -> RepoResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let matches = tables
            .posts
            .iter()
            .filter(|post| post.user_id.to_string().contains(term));
        Ok(paginate(matches, page))
    }

    async fn get_post(&self, id: i32) -> RepoResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn create_post(&self, post: &PostInput) -> RepoResult<Post> {
        let mut tables = self.tables.write().await;
        tables.last_post_id += 1;
        let created = Post {
            id: tables.last_post_id,
            title: post.title.clone(),
            body: post.body.clone(),
            user_id: post.user_id,
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: i32, post: &PostInput) -> RepoResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.posts.iter_mut().find(|existing| existing.id == id) else {
            return Ok(None);
        };
        existing.title = post.title.clone();
        existing.body = post.body.clone();
        existing.user_id = post.user_id;
        Ok(Some(existing.clone()))
    }

    async fn delete_post(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        Ok(tables.posts.len() < before)
    }

    async fn list_comments(&self, page: Page) -> RepoResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.comments.iter(), page))
    }

    async fn search_comments_by_username(
        &self,
        term: &str,
        page: Page,
    ) -> RepoResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let matches = tables
            .comments
            .iter()
            .filter(|comment| comment.username.contains(term));
        Ok(paginate(matches, page))
    }

    async fn get_comment(&self, id: i32) -> RepoResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|comment| comment.id == id).cloned())
    }

    async fn create_comment(&self, comment: &CommentInput) -> RepoResult<Comment> {
        let mut tables = self.tables.write().await;
        tables.last_comment_id += 1;
        let created = Comment {
            id: tables.last_comment_id,
            user_id: comment.user_id,
            username: comment.username.clone(),
            comment_body: comment.comment_body.clone(),
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn update_comment(
        &self,
        id: i32,
        comment: &CommentInput,
    ) -> RepoResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.comments.iter_mut().find(|existing| existing.id == id) else {
            return Ok(None);
        };
        existing.user_id = comment.user_id;
        existing.username = comment.username.clone();
        existing.comment_body = comment.comment_body.clone();
        Ok(Some(existing.clone()))
    }

    async fn delete_comment(&self, id: i32) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|comment| comment.id != id);
        Ok(tables.comments.len() < before)
    }
}
