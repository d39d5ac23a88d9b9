use sqlx::postgres::PgPoolOptions;
use study_notes_api::{
    config::AppConfig,
    repository::{PostgresRepository, Repository},
    security::hash_password,
};

/// create_admin
///
/// Out-of-band seeding binary: creates the admin user the API itself has no route
/// for. Run once against a fresh database:
///
///   ADMIN_USERNAME=admin ADMIN_PASSWORD=... cargo run --bin create_admin
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = PostgresRepository::new(pool);

    // The users table must exist before seeding into it.
    repo.init_schema()
        .await
        .expect("Failed to create database schema");

    let password_hash = hash_password(&password).expect("Failed to hash admin password");
    let user = repo
        .create_user(&username, &password_hash, true)
        .await
        .expect("Failed to create admin user");

    println!("Created admin user '{}' with id = {}", user.username, user.id);
}
