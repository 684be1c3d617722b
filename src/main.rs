//! DJ social platform API server.

use std::net::SocketAddr;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backspin::api::{AppState, api_router};
use backspin::config::AppConfig;
use backspin::crypto::hash_password;
use backspin::db::{DbConfig, DbPool, NewUser, UserRepository, run_migrations};
use backspin::models::Role;

/// DJ social platform backend.
#[derive(Parser)]
#[command(name = "backspin")]
#[command(about = "API server for the backspin DJ platform")]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "backspin.db")]
    database: String,

    /// Server port
    #[arg(short, long, default_value = "4000")]
    port: u16,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user account
    CreateUser {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Create as admin user
        #[arg(short, long)]
        admin: bool,
    },

    /// Start the server (default)
    Serve,
}

fn setup_database(database_url: &str) -> DbPool {
    let config = DbConfig::new(database_url);
    let pool = config.build_pool().expect("Failed to create database pool");

    // Run migrations
    let mut conn = pool.get().expect("Failed to get database connection");
    run_migrations(&mut conn).expect("Failed to run migrations");

    pool
}

fn create_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let password_hash = hash_password(password)?;
    let repo = UserRepository::new(pool.clone());

    let role = if admin { Role::Admin } else { Role::Dj };
    let new_user = NewUser {
        email,
        display_name: username,
        avatar_url: None,
        password_hash: Some(&password_hash),
        role: role.as_str(),
    };

    match repo.register(&new_user, username) {
        Ok((user, profile)) => {
            println!(
                "Created user '{}' (id: {}, admin: {})",
                profile.username, user.id, admin
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to create user: {}", e);
            Err(Box::new(e))
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backspin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Setup database
    let pool = setup_database(&cli.database);

    match cli.command {
        Some(Commands::CreateUser {
            username,
            email,
            password,
            admin,
        }) => {
            if create_user(&pool, &username, &email, &password, admin).is_err() {
                std::process::exit(1);
            }
        }
        Some(Commands::Serve) | None => {
            run_server(pool, cli.port).await;
        }
    }
}

async fn run_server(pool: DbPool, port: u16) {
    // Check if there are any users
    let repo = UserRepository::new(pool.clone());
    if !repo.has_users().unwrap_or(false) {
        tracing::warn!("No users found in database. Create one with:");
        tracing::warn!(
            "  backspin create-user --username admin --email admin@example.com --password <password> --admin"
        );
    }

    let config = AppConfig::from_env();
    let state = AppState::new(pool, config);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            tracing::error!("Is another process already using port {}?", port);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "backspin listening on {}",
        listener
            .local_addr()
            .expect("listener should have local addr")
    );

    // ConnectInfo is needed by the play handler's client-address fallback.
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
