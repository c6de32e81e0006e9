//! LexiDeck client core.
//!
//! Headless view-models for a vocabulary flashcard app: account screens, a
//! paged word feed backed by a remote document store, locally persisted
//! favorites, statistics and settings.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod models;
pub mod presentation;
pub mod screens;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{Alert, ClientError};
pub use state::AppContext;
