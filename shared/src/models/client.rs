//! Client Model

use serde::{Deserialize, Serialize};

/// Client entity (converted lead)
///
/// `email_normalized` carries the unique index that makes the client
/// collection the single ordering authority for concurrent conversions.
/// `assigned_to` is set once at creation or merge time and never silently
/// overwritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Client {
    pub id: i64,
    /// Sequential display number, rendered as `CLT-xxxxx`
    pub client_no: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub email_normalized: String,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub nationality: Option<String>,
    pub visa_type: Option<String>,
    pub destination_country: Option<String>,
    pub assigned_to: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Client {
    /// Human-readable display code, e.g. `CLT-01024`.
    pub fn display_code(&self) -> String {
        format!("CLT-{:05}", self.client_no)
    }
}

/// Client with origin linkage (for detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    /// Enquiry ids that contributed to this client, in merge order
    pub source_enquiry_ids: Vec<i64>,
}

/// Update client payload
///
/// The natural key (`email`) and ownership (`assigned_to`) are not
/// editable here; both belong to the conversion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub nationality: Option<String>,
    pub visa_type: Option<String>,
    pub destination_country: Option<String>,
    pub is_active: Option<bool>,
}
