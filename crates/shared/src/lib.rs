//! Shared types and configuration for Cobro.
//!
//! This crate provides common types used across all other crates:
//! - Configuration management
//! - JWT claims and token validation

pub mod auth;
pub mod config;
pub mod jwt;

pub use auth::{Claims, Role};
pub use config::AppConfig;
pub use jwt::{JwtConfig, JwtError, JwtService};
