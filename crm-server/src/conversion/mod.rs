//! Enquiry-to-Client Conversion Engine
//!
//! Promotes a sales lead into a durable client record while guaranteeing
//! one client per normalized email, even under concurrent conversion
//! attempts.
//!
//! # Flow
//!
//! ```text
//! convert(enquiry, team member, allow_duplicate)
//!   ├─ validate enquiry (exists, unconverted, minimum identity)
//!   ├─ resolve team-member assignment
//!   ├─ duplicate pre-check (Identity Matcher, read-only)
//!   │    └─ match found + unconfirmed → Aborted (decision point)
//!   ├─ optimistic commit: create client + link source + mark enquiry
//!   │    └─ unique email index rejects → Conflict Reconciler
//!   └─ Converted | Merged
//! ```
//!
//! No application-level lock serializes conversions; the unique index on
//! `client.email_normalized` is the sole ordering authority. The losing
//! side of a race is repaired into a merge instead of failing.

pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod reconciler;

#[cfg(test)]
mod tests;

pub use error::ConversionError;
pub use matcher::{IdentityMatch, normalize_email};
pub use orchestrator::{
    ConversionEngine, ConversionOutcome, ConversionRequest, DuplicateCheck,
};
