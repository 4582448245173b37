//! Core types shared across ClarityDash facilities
//!
//! This crate provides foundational types used by both the error and
//! logging facilities and by the entity store:
//!
//! - **Schema constants**: Canonical field keys and event names
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction

pub mod schema;
pub mod sensitive;

pub use sensitive::Sensitive;
