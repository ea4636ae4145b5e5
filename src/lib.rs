//! Weibo topic crawler library.
//!
//! Walks the mobile web search API for a list of topics, resolves each
//! post (long-text expansion, repost unwrapping, comment feeds), and
//! persists normalized records incrementally to CSV and/or SQLite.

pub mod api;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod error;
pub mod media;
pub mod models;
pub mod normalize;
pub mod sink;
pub mod text_extract;
