//! Paginated vocabulary listing and local card navigation.

pub mod feed;
pub mod navigator;

pub use feed::{FetchOutcome, VocabularyFeed};
pub use navigator::CardNavigator;
