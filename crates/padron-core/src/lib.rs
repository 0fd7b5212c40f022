//! Core types and trait definitions for the Padron personal-data registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the HTTP layer drives
//! the functions in [`service`] and the [`journal::HybridLog`].

pub mod answer;
pub mod error;
pub mod journal;
pub mod log;
pub mod memory;
pub mod persona;
pub mod service;
pub mod store;
pub mod validate;

pub use error::{Error, Result, ValidationError};
