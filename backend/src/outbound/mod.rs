//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **security**: Argon2 password hashing and JWT access tokens
//! - **chat**: Stream Chat over its REST API
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod chat;
pub mod persistence;
pub mod security;
