//! Lore Rename — reference propagation for generated narrative worlds.
//!
//! Finds every textual and structural reference to an entity's name across
//! entities, chronicles and narrative events, classifies each occurrence,
//! lets a reviewer decide on it, and rewrites the underlying records with
//! grammatically coherent replacement text.

pub mod config;
pub mod core;
pub mod schema;
pub mod storage;
