//! Data Models
//!
//! Record types shared between the API layer and storage. Row mappings
//! (`sqlx::FromRow`) are gated behind the `db` feature so client-side
//! consumers don't pull in the database driver.

pub mod client;
pub mod enquiry;
pub mod team_member;

pub use client::{Client, ClientDetail, ClientUpdate};
pub use enquiry::{Enquiry, EnquiryCreate, EnquiryStatus, EnquiryUpdate};
pub use team_member::{TeamMember, TeamMemberCreate};
