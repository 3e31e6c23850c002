//! Application services layer.

pub mod error;
pub mod feed;
pub mod listing;
pub mod pagination;
pub mod post;
pub mod preview;
pub mod site;
pub mod source;
pub mod stream;
