//! Utility module - shared helpers and types
//!
//! # Contents
//!
//! - [`AppError`] / [`AppResponse`] - application error type and API envelope
//! - [`validation`] - input length/format checks for CRUD handlers
//! - [`logger`] - tracing setup

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{ok, ok_with_message};
pub use error::{AppError, AppResponse, AppResult};
