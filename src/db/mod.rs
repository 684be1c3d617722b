//! Database module for SQLite persistence.

pub mod connection;
pub mod repository;
pub mod schema;

pub use connection::{DbConfig, DbConn, DbPool, run_migrations};
pub use repository::{
    AccountRepoError, CommentRepository, ContentRepoError, MixChanges, MixRepository, NewComment,
    NewMix, NewUser, PlayRepository, ProfileChanges, ProfileRepository, SessionRepository,
    StreamRepository, UserRepository,
};
