//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into booking lifecycle operations.
//! - Define the collaborator seams (reference lookup, notifications).
//! - Keep caller layers decoupled from storage details.

pub mod booking_service;
pub mod notify;
pub mod page;
pub mod reference;
