//! Core types and trait definitions for the dex data-exchange pipeline.
//!
//! No HTTP or database dependencies. The normalizer is pure: raw provider
//! records go in, canonical countries and rejected records come out.

#![allow(async_fn_in_trait)]

pub mod country;
pub mod error;
pub mod normalize;
pub mod provenance;
pub mod provider;
pub mod store;

pub use error::{Error, Result};
