//! Database repositories for accounts, content, and engagement.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use thiserror::Error;

use crate::crypto::generate_token;
use crate::db::DbPool;
use crate::db::schema::{
    comment_likes, comments, follows, live_streams, mix_likes, mixes, play_history, profiles,
    sessions, users,
};
use crate::models::mix::MixAnnotations;
use crate::models::user::Role;
use crate::models::{Comment, LiveStream, Mix, Profile, User};

diesel::define_sql_function! {
    fn last_insert_rowid() -> diesel::sql_types::Integer;
}

/// Errors that can occur during account repository operations
/// (users, profiles, sessions).
#[derive(Debug, Error)]
pub enum AccountRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),
}

/// Errors that can occur during content repository operations
/// (mixes, comments, plays, streams).
#[derive(Debug, Error)]
pub enum ContentRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

// ============================================================================
// User Repository
// ============================================================================

/// Database row representation for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    #[allow(dead_code)]
    pub created_at: NaiveDateTime,
    #[allow(dead_code)]
    pub updated_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            password_hash: row.password_hash,
            role: Role::from_str_lossy(&row.role),
        }
    }
}

/// Data for inserting a new user.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub display_name: &'a str,
    pub avatar_url: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = profiles)]
struct NewProfileRow<'a> {
    user_id: i32,
    username: &'a str,
    avatar_url: Option<&'a str>,
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a user together with its profile. The profile is created in
    /// the same transaction so an account never exists without one.
    pub fn register(
        &self,
        new_user: &NewUser,
        username: &str,
    ) -> Result<(User, Profile), AccountRepoError> {
        let mut conn = self.pool.get()?;

        let email_taken = users::table
            .filter(users::email.eq(new_user.email))
            .count()
            .get_result::<i64>(&mut conn)?;

        if email_taken > 0 {
            return Err(AccountRepoError::EmailTaken(new_user.email.to_string()));
        }

        let username_taken = profiles::table
            .filter(profiles::username.eq(username))
            .count()
            .get_result::<i64>(&mut conn)?;

        if username_taken > 0 {
            return Err(AccountRepoError::UsernameTaken(username.to_string()));
        }

        let (user_row, profile_row) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(users::table)
                .values(new_user)
                .execute(conn)?;

            let user_id = diesel::select(last_insert_rowid()).get_result::<i32>(conn)?;

            diesel::insert_into(profiles::table)
                .values(NewProfileRow {
                    user_id,
                    username,
                    avatar_url: new_user.avatar_url,
                })
                .execute(conn)?;

            let user_row = users::table
                .filter(users::id.eq(user_id))
                .select(UserRow::as_select())
                .first(conn)?;

            let profile_row = profiles::table
                .filter(profiles::user_id.eq(user_id))
                .select(ProfileRow::as_select())
                .first(conn)?;

            Ok((user_row, profile_row))
        })?;

        Ok((User::from(user_row), Profile::from(profile_row)))
    }

    /// Find a user by ID.
    pub fn find_by_id(&self, user_id: i32) -> Result<Option<User>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by email.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by login identifier: an email first, then a profile
    /// username.
    pub fn find_by_login(&self, login: &str) -> Result<Option<User>, AccountRepoError> {
        if let Some(user) = self.find_by_email(login)? {
            return Ok(Some(user));
        }

        let mut conn = self.pool.get()?;

        let result = profiles::table
            .inner_join(users::table)
            .filter(profiles::username.eq(login))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user together with its profile username.
    pub fn find_with_username(
        &self,
        user_id: i32,
    ) -> Result<Option<(User, String)>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .inner_join(profiles::table)
            .filter(users::id.eq(user_id))
            .select((UserRow::as_select(), profiles::username))
            .first::<(UserRow, String)>(&mut conn)
            .optional()?;

        Ok(result.map(|(row, username)| (User::from(row), username)))
    }

    /// Fetch users and usernames for a set of ids, for attaching author
    /// summaries to mixes and comments.
    pub fn find_with_usernames(
        &self,
        user_ids: &[i32],
    ) -> Result<Vec<(User, String)>, AccountRepoError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get()?;

        let rows = users::table
            .inner_join(profiles::table)
            .filter(users::id.eq_any(user_ids.iter().copied()))
            .select((UserRow::as_select(), profiles::username))
            .load::<(UserRow, String)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(row, username)| (User::from(row), username))
            .collect())
    }

    /// Check if any users exist in the database.
    pub fn has_users(&self) -> Result<bool, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let count = users::table.count().get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }
}

// ============================================================================
// Session Repository
// ============================================================================

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
struct NewSessionRow<'a> {
    token: &'a str,
    user_id: i32,
}

/// Repository for session tokens.
#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a session for a user and return the opaque token.
    pub fn create(&self, user_id: i32) -> Result<String, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let token = generate_token();
        diesel::insert_into(sessions::table)
            .values(NewSessionRow {
                token: &token,
                user_id,
            })
            .execute(&mut conn)?;

        Ok(token)
    }

    /// Resolve a session token to its user.
    pub fn find_user(&self, token: &str) -> Result<Option<User>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(token))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Delete a session token (logout).
    pub fn delete(&self, token: &str) -> Result<bool, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(sessions::table.filter(sessions::token.eq(token)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}

// ============================================================================
// Profile Repository
// ============================================================================

/// Database row representation for profiles.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProfileRow {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Option<String>,
    pub location: Option<String>,
    pub equipment: Option<String>,
    pub social_links: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            bio: row.bio,
            avatar_url: row.avatar_url,
            cover_url: row.cover_url,
            genres: row.genres,
            location: row.location,
            equipment: row.equipment,
            social_links: row.social_links,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Option<String>,
    pub location: Option<String>,
    pub equipment: Option<String>,
    pub social_links: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = follows)]
struct NewFollowRow {
    follower_id: i32,
    followee_id: i32,
}

/// Repository for profiles and the follow graph.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: DbPool,
}

impl ProfileRepository {
    /// Create a new profile repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a profile by username.
    pub fn find_by_username(&self, username: &str) -> Result<Option<Profile>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = profiles::table
            .filter(profiles::username.eq(username))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Profile::from))
    }

    /// Find a profile by its owning user id.
    pub fn find_by_user_id(&self, user_id: i32) -> Result<Option<Profile>, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let result = profiles::table
            .filter(profiles::user_id.eq(user_id))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Profile::from))
    }

    /// Apply a partial update to a user's profile.
    pub fn update(
        &self,
        user_id: i32,
        mut changes: ProfileChanges,
    ) -> Result<bool, AccountRepoError> {
        let mut conn = self.pool.get()?;

        changes.updated_at = Some(Utc::now().naive_utc());

        let updated = diesel::update(profiles::table.filter(profiles::user_id.eq(user_id)))
            .set(&changes)
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Toggle the follow edge from `follower_id` to `followee_id`.
    ///
    /// Membership is a unique (follower, followee) pair, so the toggle is an
    /// atomic delete / insert-or-ignore and concurrent calls converge.
    /// Returns the new state and the followee's follower count.
    pub fn toggle_follow(
        &self,
        follower_id: i32,
        followee_id: i32,
    ) -> Result<(bool, i64), AccountRepoError> {
        let mut conn = self.pool.get()?;

        let removed = diesel::delete(
            follows::table
                .filter(follows::follower_id.eq(follower_id))
                .filter(follows::followee_id.eq(followee_id)),
        )
        .execute(&mut conn)?;

        let following = if removed == 0 {
            diesel::insert_or_ignore_into(follows::table)
                .values(NewFollowRow {
                    follower_id,
                    followee_id,
                })
                .execute(&mut conn)?;
            true
        } else {
            false
        };

        let count = follows::table
            .filter(follows::followee_id.eq(followee_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok((following, count))
    }

    /// Check whether `follower_id` currently follows `followee_id`.
    pub fn is_following(
        &self,
        follower_id: i32,
        followee_id: i32,
    ) -> Result<bool, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let count = follows::table
            .filter(follows::follower_id.eq(follower_id))
            .filter(follows::followee_id.eq(followee_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    /// Number of users following `user_id`.
    pub fn follower_count(&self, user_id: i32) -> Result<i64, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let count = follows::table
            .filter(follows::followee_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }

    /// Number of users `user_id` follows.
    pub fn following_count(&self, user_id: i32) -> Result<i64, AccountRepoError> {
        let mut conn = self.pool.get()?;

        let count = follows::table
            .filter(follows::follower_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }
}

// ============================================================================
// Mix Repository
// ============================================================================

/// Database row representation for mixes.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mixes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MixRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
    pub duration: i32,
    pub play_count: i32,
    pub is_public: bool,
    pub tags: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<MixRow> for Mix {
    fn from(row: MixRow) -> Self {
        Mix {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            audio_url: row.audio_url,
            cover_url: row.cover_url,
            genre: row.genre,
            duration: row.duration,
            play_count: row.play_count,
            is_public: row.is_public,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Data for inserting a new mix. Play count starts at zero via the schema
/// default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = mixes)]
pub struct NewMix<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub audio_url: &'a str,
    pub cover_url: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub duration: i32,
    pub is_public: bool,
    pub tags: Option<String>,
}

/// Partial mix update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = mixes)]
pub struct MixChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub audio_url: Option<String>,
    pub cover_url: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<i32>,
    pub is_public: Option<bool>,
    pub tags: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = mix_likes)]
struct NewMixLikeRow {
    mix_id: i32,
    user_id: i32,
}

/// Repository for mixes and mix likes.
#[derive(Clone)]
pub struct MixRepository {
    pool: DbPool,
}

impl MixRepository {
    /// Create a new mix repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new mix and return it.
    pub fn create(&self, new_mix: &NewMix) -> Result<Mix, ContentRepoError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(mixes::table)
            .values(new_mix)
            .execute(&mut conn)?;

        let mix_id = diesel::select(last_insert_rowid()).get_result::<i32>(&mut conn)?;

        let row = mixes::table
            .filter(mixes::id.eq(mix_id))
            .select(MixRow::as_select())
            .first(&mut conn)?;

        Ok(Mix::from(row))
    }

    /// Find a mix by ID.
    pub fn find_by_id(&self, mix_id: i32) -> Result<Option<Mix>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let result = mixes::table
            .filter(mixes::id.eq(mix_id))
            .select(MixRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Mix::from))
    }

    /// Public mixes, newest first.
    pub fn list_public(&self, offset: i64, limit: i64) -> Result<Vec<Mix>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let rows = mixes::table
            .filter(mixes::is_public.eq(true))
            .order(mixes::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(MixRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Mix::from).collect())
    }

    /// A DJ's public mixes, newest first.
    pub fn list_public_by_user(&self, user_id: i32) -> Result<Vec<Mix>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let rows = mixes::table
            .filter(mixes::user_id.eq(user_id))
            .filter(mixes::is_public.eq(true))
            .order(mixes::created_at.desc())
            .select(MixRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Mix::from).collect())
    }

    /// Apply a partial update to a mix. Ownership is the caller's concern.
    pub fn update(&self, mix_id: i32, mut changes: MixChanges) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        changes.updated_at = Some(Utc::now().naive_utc());

        let updated = diesel::update(mixes::table.filter(mixes::id.eq(mix_id)))
            .set(&changes)
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Delete a mix and everything hanging off it: likes, comments and
    /// their likes, play history.
    pub fn delete(&self, mix_id: i32) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let deleted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let comment_ids = comments::table
                .filter(comments::mix_id.eq(mix_id))
                .select(comments::id);

            diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(comment_ids)))
                .execute(conn)?;

            diesel::delete(comments::table.filter(comments::mix_id.eq(mix_id))).execute(conn)?;
            diesel::delete(mix_likes::table.filter(mix_likes::mix_id.eq(mix_id))).execute(conn)?;
            diesel::delete(play_history::table.filter(play_history::mix_id.eq(mix_id)))
                .execute(conn)?;

            diesel::delete(mixes::table.filter(mixes::id.eq(mix_id))).execute(conn)
        })?;

        Ok(deleted > 0)
    }

    /// Toggle the calling user's like on a mix.
    ///
    /// Same atomic delete / insert-or-ignore shape as the follow toggle.
    /// Returns the new state and the mix's like count.
    pub fn toggle_like(
        &self,
        user_id: i32,
        mix_id: i32,
    ) -> Result<(bool, i64), ContentRepoError> {
        let mut conn = self.pool.get()?;

        let removed = diesel::delete(
            mix_likes::table
                .filter(mix_likes::mix_id.eq(mix_id))
                .filter(mix_likes::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        let liked = if removed == 0 {
            diesel::insert_or_ignore_into(mix_likes::table)
                .values(NewMixLikeRow { mix_id, user_id })
                .execute(&mut conn)?;
            true
        } else {
            false
        };

        let count = mix_likes::table
            .filter(mix_likes::mix_id.eq(mix_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok((liked, count))
    }

    /// Engagement annotations (like count, comment count, caller's like
    /// state) for a set of mixes, computed with three purpose-built queries
    /// rather than one deeply nested fetch.
    pub fn annotations_for(
        &self,
        mix_ids: &[i32],
        viewer: Option<i32>,
    ) -> Result<HashMap<i32, MixAnnotations>, ContentRepoError> {
        let mut notes: HashMap<i32, MixAnnotations> = HashMap::new();
        if mix_ids.is_empty() {
            return Ok(notes);
        }

        let mut conn = self.pool.get()?;

        let like_counts = mix_likes::table
            .filter(mix_likes::mix_id.eq_any(mix_ids.iter().copied()))
            .group_by(mix_likes::mix_id)
            .select((mix_likes::mix_id, diesel::dsl::count_star()))
            .load::<(i32, i64)>(&mut conn)?;

        for (mix_id, count) in like_counts {
            notes.entry(mix_id).or_default().likes_count = count;
        }

        let comment_counts = comments::table
            .filter(comments::mix_id.eq_any(mix_ids.iter().copied()))
            .group_by(comments::mix_id)
            .select((comments::mix_id, diesel::dsl::count_star()))
            .load::<(i32, i64)>(&mut conn)?;

        for (mix_id, count) in comment_counts {
            notes.entry(mix_id).or_default().comments_count = count;
        }

        if let Some(viewer_id) = viewer {
            let liked = mix_likes::table
                .filter(mix_likes::mix_id.eq_any(mix_ids.iter().copied()))
                .filter(mix_likes::user_id.eq(viewer_id))
                .select(mix_likes::mix_id)
                .load::<i32>(&mut conn)?;

            for mix_id in liked {
                notes.entry(mix_id).or_default().is_liked = true;
            }
        }

        Ok(notes)
    }

    /// Increment a mix's play counter and return the new count.
    pub fn increment_plays(&self, mix_id: i32) -> Result<Option<i32>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(mixes::table.filter(mixes::id.eq(mix_id)))
            .set(mixes::play_count.eq(mixes::play_count + 1))
            .execute(&mut conn)?;

        if updated == 0 {
            return Ok(None);
        }

        let plays = mixes::table
            .filter(mixes::id.eq(mix_id))
            .select(mixes::play_count)
            .first::<i32>(&mut conn)?;

        Ok(Some(plays))
    }
}

// ============================================================================
// Comment Repository
// ============================================================================

/// Database row representation for comments.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CommentRow {
    pub id: i32,
    pub mix_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            mix_id: row.mix_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Data for inserting a new comment. The timestamp is explicit because the
/// comment cooldown compares against it.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    pub mix_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub content: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = comment_likes)]
struct NewCommentLikeRow {
    comment_id: i32,
    user_id: i32,
}

/// Repository for comments and comment likes.
#[derive(Clone)]
pub struct CommentRepository {
    pool: DbPool,
}

impl CommentRepository {
    /// Create a new comment repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a comment and return it.
    pub fn create(&self, new_comment: &NewComment) -> Result<Comment, ContentRepoError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(comments::table)
            .values(new_comment)
            .execute(&mut conn)?;

        let comment_id = diesel::select(last_insert_rowid()).get_result::<i32>(&mut conn)?;

        let row = comments::table
            .filter(comments::id.eq(comment_id))
            .select(CommentRow::as_select())
            .first(&mut conn)?;

        Ok(Comment::from(row))
    }

    /// Find a comment by ID.
    pub fn find_by_id(&self, comment_id: i32) -> Result<Option<Comment>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let result = comments::table
            .filter(comments::id.eq(comment_id))
            .select(CommentRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Comment::from))
    }

    /// Top-level comments on a mix, newest first.
    pub fn list_top_level(&self, mix_id: i32) -> Result<Vec<Comment>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let rows = comments::table
            .filter(comments::mix_id.eq(mix_id))
            .filter(comments::parent_id.is_null())
            .order(comments::created_at.desc())
            .select(CommentRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// Direct replies to a set of top-level comments, oldest first.
    pub fn list_replies(&self, parent_ids: &[i32]) -> Result<Vec<Comment>, ContentRepoError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get()?;

        let rows = comments::table
            .filter(comments::parent_id.eq_any(parent_ids.iter().map(|id| Some(*id))))
            .order(comments::created_at.asc())
            .select(CommentRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// Whether the author posted any comment within the last `window_secs`
    /// seconds. Backs the comment rate gate.
    pub fn recently_commented(
        &self,
        user_id: i32,
        window_secs: i64,
    ) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let cutoff = Utc::now().naive_utc() - chrono::Duration::seconds(window_secs);

        let count = comments::table
            .filter(comments::user_id.eq(user_id))
            .filter(comments::created_at.gt(cutoff))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    /// Toggle the calling user's like on a comment.
    pub fn toggle_like(
        &self,
        user_id: i32,
        comment_id: i32,
    ) -> Result<(bool, i64), ContentRepoError> {
        let mut conn = self.pool.get()?;

        let removed = diesel::delete(
            comment_likes::table
                .filter(comment_likes::comment_id.eq(comment_id))
                .filter(comment_likes::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        let liked = if removed == 0 {
            diesel::insert_or_ignore_into(comment_likes::table)
                .values(NewCommentLikeRow {
                    comment_id,
                    user_id,
                })
                .execute(&mut conn)?;
            true
        } else {
            false
        };

        let count = comment_likes::table
            .filter(comment_likes::comment_id.eq(comment_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok((liked, count))
    }

    /// Like counts for a set of comments.
    pub fn like_counts_for(
        &self,
        comment_ids: &[i32],
    ) -> Result<HashMap<i32, i64>, ContentRepoError> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get()?;

        let rows = comment_likes::table
            .filter(comment_likes::comment_id.eq_any(comment_ids.iter().copied()))
            .group_by(comment_likes::comment_id)
            .select((comment_likes::comment_id, diesel::dsl::count_star()))
            .load::<(i32, i64)>(&mut conn)?;

        Ok(rows.into_iter().collect())
    }

    /// The subset of `comment_ids` the viewer has liked.
    pub fn liked_set(
        &self,
        user_id: i32,
        comment_ids: &[i32],
    ) -> Result<Vec<i32>, ContentRepoError> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get()?;

        let rows = comment_likes::table
            .filter(comment_likes::comment_id.eq_any(comment_ids.iter().copied()))
            .filter(comment_likes::user_id.eq(user_id))
            .select(comment_likes::comment_id)
            .load::<i32>(&mut conn)?;

        Ok(rows)
    }
}

// ============================================================================
// Play Repository
// ============================================================================

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = play_history)]
struct NewPlayRow<'a> {
    identifier: &'a str,
    mix_id: i32,
    played_at: NaiveDateTime,
}

/// Repository for the play-cooldown history.
#[derive(Clone)]
pub struct PlayRepository {
    pool: DbPool,
}

impl PlayRepository {
    /// Create a new play repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Whether this identifier played this mix within the last
    /// `window_secs` seconds.
    pub fn recently_played(
        &self,
        identifier: &str,
        mix_id: i32,
        window_secs: i64,
    ) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let cutoff = Utc::now().naive_utc() - chrono::Duration::seconds(window_secs);

        let count = play_history::table
            .filter(play_history::identifier.eq(identifier))
            .filter(play_history::mix_id.eq(mix_id))
            .filter(play_history::played_at.gt(cutoff))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    /// Record an accepted play.
    pub fn record(
        &self,
        identifier: &str,
        mix_id: i32,
        played_at: NaiveDateTime,
    ) -> Result<(), ContentRepoError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(play_history::table)
            .values(NewPlayRow {
                identifier,
                mix_id,
                played_at,
            })
            .execute(&mut conn)?;

        Ok(())
    }
}

// ============================================================================
// Live Stream Repository
// ============================================================================

/// Database row representation for live stream records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = live_streams)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LiveStreamRow {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub provider_id: Option<String>,
    pub stream_key: Option<String>,
    pub playback_url: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<LiveStreamRow> for LiveStream {
    fn from(row: LiveStreamRow) -> Self {
        LiveStream {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            provider_id: row.provider_id,
            stream_key: row.stream_key,
            playback_url: row.playback_url,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = live_streams)]
struct NewLiveStreamRow<'a> {
    user_id: i32,
    username: &'a str,
}

/// Repository for the local active-stream records.
#[derive(Clone)]
pub struct StreamRepository {
    pool: DbPool,
}

impl StreamRepository {
    /// Create a new stream repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Reserve the user's active-stream slot. Returns `None` when the user
    /// already has an active stream; the unique user index makes the check
    /// and the reservation one atomic insert.
    pub fn try_reserve(
        &self,
        user_id: i32,
        username: &str,
    ) -> Result<Option<i32>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let inserted = diesel::insert_or_ignore_into(live_streams::table)
            .values(NewLiveStreamRow { user_id, username })
            .execute(&mut conn)?;

        if inserted == 0 {
            return Ok(None);
        }

        let id = diesel::select(last_insert_rowid()).get_result::<i32>(&mut conn)?;
        Ok(Some(id))
    }

    /// Fill a reservation with the provider's stream handle.
    pub fn fill(
        &self,
        id: i32,
        provider_id: &str,
        stream_key: &str,
        playback_url: &str,
    ) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(live_streams::table.filter(live_streams::id.eq(id)))
            .set((
                live_streams::provider_id.eq(provider_id),
                live_streams::stream_key.eq(stream_key),
                live_streams::playback_url.eq(playback_url),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Release a reservation or an ended stream by local id.
    pub fn release(&self, id: i32) -> Result<bool, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(live_streams::table.filter(live_streams::id.eq(id)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    /// Find the user's active stream record, if any.
    pub fn find_by_user(&self, user_id: i32) -> Result<Option<LiveStream>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let result = live_streams::table
            .filter(live_streams::user_id.eq(user_id))
            .select(LiveStreamRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(LiveStream::from))
    }

    /// Find a stream record by the provider's stream id.
    pub fn find_by_provider(
        &self,
        provider_id: &str,
    ) -> Result<Option<LiveStream>, ContentRepoError> {
        let mut conn = self.pool.get()?;

        let result = live_streams::table
            .filter(live_streams::provider_id.eq(provider_id))
            .select(LiveStreamRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(LiveStream::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{DbConfig, run_migrations};

    /// A single-connection in-memory pool so every operation sees the same
    /// database.
    fn test_pool() -> DbPool {
        let config = DbConfig {
            database_url: ":memory:".into(),
            max_connections: 1,
            connection_timeout: 5,
        };
        let pool = config.build_pool().unwrap();
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
        drop(conn);
        pool
    }

    fn register_user(pool: &DbPool, username: &str, email: &str) -> User {
        let repo = UserRepository::new(pool.clone());
        let (user, _profile) = repo
            .register(
                &NewUser {
                    email,
                    display_name: username,
                    avatar_url: None,
                    password_hash: None,
                    role: Role::User.as_str(),
                },
                username,
            )
            .unwrap();
        user
    }

    fn create_mix(pool: &DbPool, user_id: i32, title: &str) -> Mix {
        let repo = MixRepository::new(pool.clone());
        repo.create(&NewMix {
            user_id,
            title,
            description: None,
            audio_url: "/a.mp3",
            cover_url: None,
            genre: None,
            duration: 120,
            is_public: true,
            tags: None,
        })
        .unwrap()
    }

    #[test]
    fn test_register_creates_user_and_profile() {
        let pool = test_pool();
        let repo = UserRepository::new(pool.clone());

        let (user, profile) = repo
            .register(
                &NewUser {
                    email: "alice@example.com",
                    display_name: "Alice",
                    avatar_url: None,
                    password_hash: Some("$argon2id$fake"),
                    role: Role::Dj.as_str(),
                },
                "alice",
            )
            .unwrap();

        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.username, "alice");
        assert_eq!(user.role, Role::Dj);

        let found = repo.find_by_login("alice").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        let found = repo.find_by_login("alice@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let pool = test_pool();
        let repo = UserRepository::new(pool.clone());
        register_user(&pool, "alice", "alice@example.com");

        let dup_email = repo.register(
            &NewUser {
                email: "alice@example.com",
                display_name: "Other",
                avatar_url: None,
                password_hash: None,
                role: Role::User.as_str(),
            },
            "other",
        );
        assert!(matches!(dup_email, Err(AccountRepoError::EmailTaken(_))));

        let dup_username = repo.register(
            &NewUser {
                email: "second@example.com",
                display_name: "Other",
                avatar_url: None,
                password_hash: None,
                role: Role::User.as_str(),
            },
            "alice",
        );
        assert!(matches!(
            dup_username,
            Err(AccountRepoError::UsernameTaken(_))
        ));
    }

    #[test]
    fn test_session_round_trip() {
        let pool = test_pool();
        let user = register_user(&pool, "alice", "alice@example.com");
        let sessions = SessionRepository::new(pool.clone());

        let token = sessions.create(user.id).unwrap();
        assert_eq!(token.len(), 64);

        let found = sessions.find_user(&token).unwrap().unwrap();
        assert_eq!(found.id, user.id);

        assert!(sessions.delete(&token).unwrap());
        assert!(sessions.find_user(&token).unwrap().is_none());
    }

    #[test]
    fn test_new_mix_starts_unplayed() {
        let pool = test_pool();
        let user = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, user.id, "Test Mix");

        assert_eq!(mix.play_count, 0);
        assert!(mix.is_public);
        assert_eq!(mix.user_id, user.id);
    }

    #[test]
    fn test_like_toggle_pair_restores_state() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let bob = register_user(&pool, "bob", "bob@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = MixRepository::new(pool.clone());

        let (liked, count) = repo.toggle_like(bob.id, mix.id).unwrap();
        assert!(liked);
        assert_eq!(count, 1);

        let (liked, count) = repo.toggle_like(bob.id, mix.id).unwrap();
        assert!(!liked);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_follow_toggle_pair_restores_state() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let bob = register_user(&pool, "bob", "bob@example.com");
        let repo = ProfileRepository::new(pool.clone());

        let (following, count) = repo.toggle_follow(alice.id, bob.id).unwrap();
        assert!(following);
        assert_eq!(count, 1);
        assert!(repo.is_following(alice.id, bob.id).unwrap());
        assert_eq!(repo.following_count(alice.id).unwrap(), 1);

        let (following, count) = repo.toggle_follow(alice.id, bob.id).unwrap();
        assert!(!following);
        assert_eq!(count, 0);
        assert!(!repo.is_following(alice.id, bob.id).unwrap());
    }

    #[test]
    fn test_annotations_reflect_engagement() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let bob = register_user(&pool, "bob", "bob@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let mixes_repo = MixRepository::new(pool.clone());
        let comments_repo = CommentRepository::new(pool.clone());

        mixes_repo.toggle_like(bob.id, mix.id).unwrap();
        comments_repo
            .create(&NewComment {
                mix_id: mix.id,
                user_id: bob.id,
                parent_id: None,
                content: "nice one",
                created_at: Utc::now().naive_utc(),
            })
            .unwrap();

        let notes = mixes_repo.annotations_for(&[mix.id], Some(bob.id)).unwrap();
        let note = notes.get(&mix.id).copied().unwrap();
        assert_eq!(note.likes_count, 1);
        assert_eq!(note.comments_count, 1);
        assert!(note.is_liked);

        let notes = mixes_repo
            .annotations_for(&[mix.id], Some(alice.id))
            .unwrap();
        assert!(!notes.get(&mix.id).copied().unwrap().is_liked);
    }

    #[test]
    fn test_comment_threading_lists() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = CommentRepository::new(pool.clone());
        let now = Utc::now().naive_utc();

        let top = repo
            .create(&NewComment {
                mix_id: mix.id,
                user_id: alice.id,
                parent_id: None,
                content: "first",
                created_at: now,
            })
            .unwrap();
        let reply = repo
            .create(&NewComment {
                mix_id: mix.id,
                user_id: alice.id,
                parent_id: Some(top.id),
                content: "reply",
                created_at: now + chrono::Duration::seconds(1),
            })
            .unwrap();

        let top_level = repo.list_top_level(mix.id).unwrap();
        assert_eq!(top_level.len(), 1);
        assert_eq!(top_level[0].id, top.id);

        let replies = repo.list_replies(&[top.id]).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, reply.id);
        assert_eq!(replies[0].parent_id, Some(top.id));
    }

    #[test]
    fn test_comment_cooldown_window() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = CommentRepository::new(pool.clone());

        // An old comment outside the window does not trip the gate.
        repo.create(&NewComment {
            mix_id: mix.id,
            user_id: alice.id,
            parent_id: None,
            content: "old",
            created_at: Utc::now().naive_utc() - chrono::Duration::seconds(60),
        })
        .unwrap();
        assert!(!repo.recently_commented(alice.id, 10).unwrap());

        repo.create(&NewComment {
            mix_id: mix.id,
            user_id: alice.id,
            parent_id: None,
            content: "fresh",
            created_at: Utc::now().naive_utc(),
        })
        .unwrap();
        assert!(repo.recently_commented(alice.id, 10).unwrap());
    }

    #[test]
    fn test_play_cooldown_window() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = PlayRepository::new(pool.clone());

        assert!(!repo.recently_played("10.0.0.1", mix.id, 300).unwrap());

        repo.record("10.0.0.1", mix.id, Utc::now().naive_utc())
            .unwrap();
        assert!(repo.recently_played("10.0.0.1", mix.id, 300).unwrap());

        // A different identifier is not gated.
        assert!(!repo.recently_played("10.0.0.2", mix.id, 300).unwrap());

        // Outside the window the same identifier may play again.
        let other = create_mix(&pool, alice.id, "Second Mix");
        repo.record(
            "10.0.0.1",
            other.id,
            Utc::now().naive_utc() - chrono::Duration::seconds(301),
        )
        .unwrap();
        assert!(!repo.recently_played("10.0.0.1", other.id, 300).unwrap());
    }

    #[test]
    fn test_play_counter_increments() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = MixRepository::new(pool.clone());

        assert_eq!(repo.increment_plays(mix.id).unwrap(), Some(1));
        assert_eq!(repo.increment_plays(mix.id).unwrap(), Some(2));
        assert_eq!(repo.increment_plays(9999).unwrap(), None);
    }

    #[test]
    fn test_mix_partial_update() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let repo = MixRepository::new(pool.clone());

        let updated = repo
            .update(
                mix.id,
                MixChanges {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated);

        let found = repo.find_by_id(mix.id).unwrap().unwrap();
        assert_eq!(found.title, "Renamed");
        // Untouched fields survive a partial update.
        assert_eq!(found.audio_url, "/a.mp3");
        assert_eq!(found.duration, 120);
    }

    #[test]
    fn test_mix_delete_cascades() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let bob = register_user(&pool, "bob", "bob@example.com");
        let mix = create_mix(&pool, alice.id, "Test Mix");
        let mixes_repo = MixRepository::new(pool.clone());
        let comments_repo = CommentRepository::new(pool.clone());

        mixes_repo.toggle_like(bob.id, mix.id).unwrap();
        let comment = comments_repo
            .create(&NewComment {
                mix_id: mix.id,
                user_id: bob.id,
                parent_id: None,
                content: "bye",
                created_at: Utc::now().naive_utc(),
            })
            .unwrap();
        comments_repo.toggle_like(alice.id, comment.id).unwrap();

        assert!(mixes_repo.delete(mix.id).unwrap());
        assert!(mixes_repo.find_by_id(mix.id).unwrap().is_none());
        assert!(comments_repo.find_by_id(comment.id).unwrap().is_none());
        assert!(!mixes_repo.delete(mix.id).unwrap());
    }

    #[test]
    fn test_stream_slot_is_exclusive() {
        let pool = test_pool();
        let alice = register_user(&pool, "alice", "alice@example.com");
        let repo = StreamRepository::new(pool.clone());

        let slot = repo.try_reserve(alice.id, "alice").unwrap();
        let id = slot.expect("first reservation should succeed");

        // Second reservation is refused by the unique index.
        assert!(repo.try_reserve(alice.id, "alice").unwrap().is_none());

        assert!(repo.fill(id, "prov-1", "key-1", "https://live/prov-1").unwrap());
        let record = repo.find_by_user(alice.id).unwrap().unwrap();
        assert_eq!(record.provider_id.as_deref(), Some("prov-1"));

        assert!(repo.release(id).unwrap());
        // Slot is free again after release.
        assert!(repo.try_reserve(alice.id, "alice").unwrap().is_some());
    }
}
