//! Graph API client.

mod client;

pub use client::GraphClient;
