//! CLI command implementations.

pub mod export;
pub mod info;
pub mod list;
pub mod local;
pub mod source;
pub mod validate;
pub mod view;
