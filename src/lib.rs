//! Banco Digital credit back office library
//!
//! This library provides the domain core of the Banco Digital back office:
//! the credit-eligibility policy, the credit-request lifecycle, and the
//! services that run them against a client store.
//!
//! # Modules
//!
//! - `core`: Domain-layer namespace (models, policies, errors).
//! - `data`: Persistence contract and reference store.
//! - `obs`: Observability and logging.
//! - `clock`: Injected time source.
//! - `config`: Configuration management.
//! - `eligibility`: Credit eligibility evaluator.
//! - `errors`: Error handling types.
//! - `lifecycle`: Credit request state machine.
//! - `memory_store`: In-memory store implementation.
//! - `models`: Core data models and wire representations.
//! - `repository`: Store traits consumed by the services.
//! - `services`: Client and credit services.

pub mod core;
pub mod data;
pub mod obs;

pub mod clock;
pub mod config;
pub mod eligibility;
pub mod errors;
pub mod lifecycle;
pub mod memory_store;
pub mod models;
pub mod repository;
pub mod services;
