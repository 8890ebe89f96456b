//! Courier Storage - Database access layer
//!
//! This crate provides the PostgreSQL storage layer for Courier:
//! connection pooling, row models, repositories, and the unit-of-work
//! used by the billing ledger.

pub mod db;
pub mod models;
pub mod repository;
pub mod uow;

pub use db::{Database, DatabasePool};
pub use models::*;
pub use repository::*;
pub use uow::UnitOfWork;
