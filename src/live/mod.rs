//! External live-video provider integration.

pub mod client;

pub use client::{LiveClient, LiveError, ProviderStream, StreamTag};
