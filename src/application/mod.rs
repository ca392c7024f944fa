//! Application services layer scaffolding.

pub mod auth;
pub mod error;
pub mod pagination;
pub mod repos;
