//! HTTP handler modules for llog-api.

pub mod folders;
pub mod items;
pub mod jobs;
pub mod metadata;
