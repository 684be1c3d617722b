//! API request handlers.

pub mod auth;
pub mod engagement;
pub mod mixes;
pub mod plays;
pub mod social;
pub mod streams;
pub mod uploads;

use std::collections::HashMap;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::models::user::DjSummary;

/// Author summaries for a set of user ids, keyed by id.
pub(crate) fn dj_summaries(
    state: &AppState,
    user_ids: &[i32],
) -> Result<HashMap<i32, DjSummary>, ApiError> {
    let pairs = state.users.find_with_usernames(user_ids)?;
    Ok(pairs
        .into_iter()
        .map(|(user, username)| {
            let summary = DjSummary::new(&user, username);
            (user.id, summary)
        })
        .collect())
}
