//! Domain model for the document store.
//!
//! # Responsibility
//! - Define topics, folders and documents as plain data keyed by UUID.
//! - Own field validation and derived path computation.
//!
//! # Invariants
//! - Relations are stored as ids; the folder tree is a forest of parent ids.
//! - Paths are derived on demand and never persisted.

pub mod document;
pub mod folder;
pub mod path;
pub mod topic;
pub mod validation;
