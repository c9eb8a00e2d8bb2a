//! Declarative workflow documents.

pub mod document;

pub use document::{load, load_file};
