//! Runs against a real Postgres. Set `DATABASE_URL` and use `cargo test -- --ignored`.

use blog_api::{
    models::{ADMIN_ROLE_ID, CommentInput, NewUser, POSTER_ROLE_ID, PostInput, User, UserChanges},
    repository::{PostgresRepository, Repository, RepositoryError},
    validation::Page,
};
use chrono::Utc;
use sqlx::PgPool;
use tokio::test;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// A name no other test run has used, so tests can share one database.
fn unique(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}_{nanos}")
}

async fn create_test_user(repo: &PostgresRepository, role_id: i32) -> User {
    let username = unique("user");
    repo.create_user(NewUser {
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: format!("{username}@test.com"),
        username,
        password_hash: "hash".to_string(),
        role_id,
    })
    .await
    .expect("Failed to create test user")
}

fn all() -> Page {
    Page {
        limit: i64::MAX,
        offset: 0,
    }
}

// --- Tests ---

#[test]
#[ignore]
async fn test_roles_are_seeded() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let admin = repo.get_role(ADMIN_ROLE_ID).await.unwrap().unwrap();
    let poster = repo.get_role(POSTER_ROLE_ID).await.unwrap().unwrap();
    assert_eq!(admin.role_name, "Admin");
    assert_eq!(poster.role_name, "Poster");
    assert!(repo.get_role(99).await.unwrap().is_none());
}

#[test]
#[ignore]
async fn test_create_update_delete_user() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, POSTER_ROLE_ID).await;

    let fetched = repo.get_user_by_username(&user.username).await.unwrap();
    assert_eq!(fetched.map(|u| u.id), Some(user.id));

    let renamed = unique("renamed");
    let updated = repo
        .update_user(
            user.id,
            UserChanges {
                first_name: "New".to_string(),
                last_name: "Name".to_string(),
                username: renamed.clone(),
                email: user.email.clone(),
                password_hash: "other-hash".to_string(),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.username, renamed);
    assert_eq!(updated.role_id, POSTER_ROLE_ID);

    assert!(repo.delete_user(user.id).await.unwrap());
    assert!(!repo.delete_user(user.id).await.unwrap());
    assert!(repo.update_user(user.id, UserChanges {
        first_name: String::new(),
        last_name: String::new(),
        username: unique("gone"),
        email: unique("gone"),
        password_hash: String::new(),
    })
    .await
    .unwrap()
    .is_none());
}

#[test]
#[ignore]
async fn test_duplicate_email_is_a_unique_violation() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, POSTER_ROLE_ID).await;

    let result = repo
        .create_user(NewUser {
            first_name: "Copy".to_string(),
            last_name: "Cat".to_string(),
            username: unique("copy"),
            email: user.email.clone(),
            password_hash: "hash".to_string(),
            role_id: POSTER_ROLE_ID,
        })
        .await;
    assert!(matches!(result, Err(RepositoryError::UniqueViolation(_))));

    let matches = repo
        .find_users_by_username_or_email("nobody-has-this-name", &user.email)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[test]
#[ignore]
async fn test_post_search_by_user_id_text() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let marker = 900_000 + (Utc::now().timestamp_subsec_micros() as i32 % 9_000) * 10;

    let post = repo
        .create_post(&PostInput {
            title: "Search me".to_string(),
            body: "Body".to_string(),
            user_id: marker,
        })
        .await
        .unwrap();

    let found = repo
        .search_posts_by_user_id(&marker.to_string(), all())
        .await
        .unwrap();
    assert!(found.iter().any(|p| p.id == post.id));

    let listed = repo.list_posts(all()).await.unwrap();
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
    assert!(repo.delete_post(post.id).await.unwrap());
}

#[test]
#[ignore]
async fn test_username_search_escapes_like_wildcards() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let suffix = unique("");

    let mut ids = Vec::new();
    for name in [format!("lit_{suffix}"), format!("litX{suffix}")] {
        let user = repo
            .create_user(NewUser {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: format!("{name}@test.com"),
                username: name,
                password_hash: "hash".to_string(),
                role_id: POSTER_ROLE_ID,
            })
            .await
            .unwrap();
        ids.push(user.id);
    }

    let found = repo
        .search_users_by_username(&format!("lit_{suffix}"), all())
        .await
        .unwrap();
    assert_eq!(found.iter().map(|u| u.id).collect::<Vec<_>>(), vec![ids[0]]);

    let percent = repo
        .search_users_by_username(&format!("%{suffix}"), all())
        .await
        .unwrap();
    assert!(percent.is_empty());

    for id in ids {
        assert!(repo.delete_user(id).await.unwrap());
    }
}

#[test]
#[ignore]
async fn test_comment_roundtrip_keeps_loose_username() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let username = unique("ghost");

    let comment = repo
        .create_comment(&CommentInput {
            user_id: -1,
            username: username.clone(),
            comment_body: "Boo".to_string(),
        })
        .await
        .unwrap();

    let found = repo
        .search_comments_by_username(&username, all())
        .await
        .unwrap();
    assert_eq!(found, vec![comment.clone()]);

    let updated = repo
        .update_comment(
            comment.id,
            &CommentInput {
                user_id: -1,
                username: username.clone(),
                comment_body: "Boo!".to_string(),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.comment_body, "Boo!");
    assert!(repo.delete_comment(comment.id).await.unwrap());
    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
}
