//! Database test fixtures and utilities
//!
//! Postgres tests only run when `DATABASE_URL` points at a disposable
//! database; otherwise `test_pool` returns `None` and the test returns early.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect and migrate, or `None` when no database is configured
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to create test database pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Insert a user and make them a member of `project_id`
pub async fn seed_member(pool: &PgPool, project_id: Uuid) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(username_of(user_id))
        .bind(format!("{}@example.com", user_id.simple()))
        .execute(pool)
        .await
        .expect("Failed to insert user");
    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to insert membership");
    user_id
}

/// Insert an issue in `project_id`, optionally assigned
pub async fn seed_issue(pool: &PgPool, project_id: Uuid, assigned_to: Option<Uuid>) -> Uuid {
    let issue_id = Uuid::new_v4();
    sqlx::query("INSERT INTO issues (id, project_id, title, assigned_to) VALUES ($1, $2, $3, $4)")
        .bind(issue_id)
        .bind(project_id)
        .bind("Login page is blank")
        .bind(assigned_to)
        .execute(pool)
        .await
        .expect("Failed to insert issue");
    issue_id
}

/// Username `seed_member` gave to `user_id`
pub fn username_of(user_id: Uuid) -> String {
    format!("user_{}", user_id.simple())
}
