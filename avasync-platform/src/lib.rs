//! # avasync-platform
//!
//! REST and JSON-RPC clients for the three platforms avasync moves avatars
//! between, all behind the [`AvatarPlatform`] trait:
//!
//! - [`JiraClient`]: source of avatars
//! - [`ConfluenceClient`]: wiki destination
//! - [`BitbucketClient`]: code-host destination
//!
//! Every request goes through an [`http::HttpTransport`] with HTTP Basic
//! authentication.

pub mod bitbucket;
mod client;
pub mod confluence;
pub mod http;
pub mod jira;
pub mod types;

pub use bitbucket::BitbucketClient;
pub use client::AvatarPlatform;
pub use confluence::ConfluenceClient;
pub use jira::JiraClient;
