//! Domain models and API view types.

pub mod mix;
pub mod profile;
pub mod stream;
pub mod user;

pub use mix::{Comment, Mix};
pub use profile::Profile;
pub use stream::LiveStream;
pub use user::{Role, User};

use chrono::NaiveDateTime;

/// Render a stored timestamp the way the API reports times.
pub fn timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
