//! Domain layer types and invariants.

pub mod error;
pub mod posts;
pub mod reading_time;
pub mod rich_text;
