//! # Cohort Core
//!
//! Business logic for the Cohort enrollment service: taking the enrollment
//! fee through an external payment gateway, moving students through
//! admission review, and tracking lecture completion against the published
//! course outline.
//!
//! ## Architecture
//!
//! - [`domain`]: the services (`OrderIssuer`, `PaymentVerifier`,
//!   `AdmissionWorkflow`, `ProgressTracker`, `CourseContentTree`) and the
//!   pure enrollment state machine
//! - [`database`]: repository ports plus PostgreSQL and in-memory adapters
//! - [`application`]: [`application::AppUnitOfWork`], the bundle of ports
//!   handed to services
//! - [`gateway`]: the payment gateway port and its HTTP adapter
//! - [`crypto`]: callback signature checks and session token hashing
#![allow(missing_docs)]

pub mod application;
pub mod crypto;
pub mod database;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod sync;

pub use error::{CoreError, Result};

/// Embedded schema migrations for the PostgreSQL adapters.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
