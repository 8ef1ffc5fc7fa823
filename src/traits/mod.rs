//! Core traits for scoped resource management.

mod release;
mod source;

pub use release::Release;
pub use source::ResourceSource;
