//! Shared types for the CRM workspace.
//!
//! Data models and small utilities used by both the server crate and any
//! future client crates:
//!
//! - **Models** (`models`): enquiry, client and team-member records plus
//!   their create/update payloads
//! - **Utilities** (`util`): timestamps and snowflake-style resource IDs

pub mod models;
pub mod util;
