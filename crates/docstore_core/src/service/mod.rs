//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into multi-entity use-cases.
//! - Keep the CLI and HTTP layers decoupled from storage details.

pub mod transfer_service;
