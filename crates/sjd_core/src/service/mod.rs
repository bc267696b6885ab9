//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI and request layers decoupled from storage details.

pub mod account_service;
pub mod document_service;
pub mod hearing_service;
