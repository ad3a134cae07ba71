//! Indexden Core Library
//!
//! Domain types shared by the indexden client and tools:
//! - Documents, identifiers, variables and categories
//! - Index metadata and batch outcome records
//! - Scoring functions
//! - Search options and results
//! - Client configuration

pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod submission;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::ValidationError;
pub use models::*;
pub use search::{
    Autocomplete, CategoryFilter, Match, MatchCount, SearchOption, SearchResult, Suggestions,
};
pub use submission::{Submission, Submittable};
