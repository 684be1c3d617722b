//! Database connection pool and management.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

/// Type alias for our connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Type alias for a pooled connection.
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connection_timeout: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "backspin.db".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Build a connection pool from this configuration.
    pub fn build_pool(&self) -> Result<DbPool, Box<dyn std::error::Error>> {
        let manager = ConnectionManager::<SqliteConnection>::new(&self.database_url);

        Pool::builder()
            .max_size(self.max_connections)
            .connection_timeout(Duration::from_secs(self.connection_timeout))
            .build(manager)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

/// Run the SQL migrations to set up the database schema.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Create users table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            avatar_url TEXT,
            password_hash TEXT,
            role TEXT NOT NULL DEFAULT 'USER',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(conn)?;

    // Create profiles table (1:1 with users)
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
            username TEXT NOT NULL UNIQUE,
            bio TEXT,
            avatar_url TEXT,
            cover_url TEXT,
            genres TEXT,
            location TEXT,
            equipment TEXT,
            social_links TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_profiles_username ON profiles(username)")
        .execute(conn)?;

    // Create sessions table (opaque bearer tokens)
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    // Create mixes table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS mixes (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            description TEXT,
            audio_url TEXT NOT NULL,
            cover_url TEXT,
            genre TEXT,
            duration INTEGER NOT NULL DEFAULT 0,
            play_count INTEGER NOT NULL DEFAULT 0,
            is_public BOOLEAN NOT NULL DEFAULT TRUE,
            tags TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_mixes_user_id ON mixes(user_id)")
        .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_mixes_created_at ON mixes(created_at)")
        .execute(conn)?;

    // Like membership is a junction table with a unique pair index, so a
    // toggle is an atomic insert-or-ignore / delete rather than a
    // read-modify-write of an id list.
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS mix_likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            mix_id INTEGER NOT NULL REFERENCES mixes(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_mix_likes_pair ON mix_likes(mix_id, user_id)",
    )
    .execute(conn)?;

    // Create comments table (one level of reply nesting via parent_id)
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            mix_id INTEGER NOT NULL REFERENCES mixes(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            parent_id INTEGER REFERENCES comments(id),
            content TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_comments_mix_id ON comments(mix_id)")
        .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_comments_user_created ON comments(user_id, created_at)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS comment_likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            comment_id INTEGER NOT NULL REFERENCES comments(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_comment_likes_pair ON comment_likes(comment_id, user_id)",
    )
    .execute(conn)?;

    // Create follows table (social graph junction)
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            follower_id INTEGER NOT NULL REFERENCES users(id),
            followee_id INTEGER NOT NULL REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_follows_pair ON follows(follower_id, followee_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id)",
    )
    .execute(conn)?;

    // Create play_history table. Only consumer is the play cooldown check.
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS play_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            identifier TEXT NOT NULL,
            mix_id INTEGER NOT NULL REFERENCES mixes(id),
            played_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_play_history_lookup ON play_history(identifier, mix_id, played_at)",
    )
    .execute(conn)?;

    // Create live_streams table. Rows exist only while a stream is live;
    // the unique user index is what enforces one active stream per user,
    // before any provider traffic happens.
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS live_streams (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            username TEXT NOT NULL,
            provider_id TEXT,
            stream_key TEXT,
            playback_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_live_streams_user ON live_streams(user_id)",
    )
    .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.database_url, "backspin.db");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_in_memory_pool_migrates() {
        let config = DbConfig::new(":memory:");
        let pool = config.build_pool().unwrap();
        let mut conn = pool.get().unwrap();
        assert!(run_migrations(&mut conn).is_ok());
        // Idempotent on a second run
        assert!(run_migrations(&mut conn).is_ok());
    }
}
