//! Core types for Ladle.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{EmailAddress, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
