//! Enquiry Model

use serde::{Deserialize, Serialize};

/// Enquiry workflow status.
///
/// Historical data mixes casings and spellings ("New", "active",
/// "not connect"), so raw values are normalized exactly once at the
/// boundary. Anything unrecognized is preserved as [`EnquiryStatus::Legacy`]
/// instead of being rejected, so old rows keep loading.
///
/// Conversion to a client is orthogonal to this status: converting an
/// enquiry flips `is_client`/`client_id` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnquiryStatus {
    New,
    Contacted,
    Qualified,
    Processing,
    Closed,
    Lost,
    Active,
    NotConnected,
    Confirmed,
    Cancelled,
    OffLeads,
    Referral,
    /// Unrecognized stored value, kept verbatim
    Legacy(String),
}

impl EnquiryStatus {
    /// Normalize a raw stored or submitted status value.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "new" => Self::New,
            "contacted" => Self::Contacted,
            "qualified" => Self::Qualified,
            "processing" => Self::Processing,
            "closed" => Self::Closed,
            "lost" => Self::Lost,
            "active" => Self::Active,
            "not connect" | "not connected" => Self::NotConnected,
            "confirmed" => Self::Confirmed,
            "cancelled" | "canceled" => Self::Cancelled,
            "off leads" | "off lead" => Self::OffLeads,
            "referral" => Self::Referral,
            _ => Self::Legacy(raw.trim().to_string()),
        }
    }

    /// Canonical label written to storage and API responses.
    pub fn as_label(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Processing => "Processing",
            Self::Closed => "Closed",
            Self::Lost => "Lost",
            Self::Active => "Active",
            Self::NotConnected => "Not Connected",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::OffLeads => "Off Leads",
            Self::Referral => "Referral",
            Self::Legacy(raw) => raw,
        }
    }
}

impl Default for EnquiryStatus {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for EnquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl From<String> for EnquiryStatus {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<EnquiryStatus> for String {
    fn from(status: EnquiryStatus) -> Self {
        status.as_label().to_string()
    }
}

#[cfg(feature = "db")]
impl sqlx::Type<sqlx::Sqlite> for EnquiryStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

#[cfg(feature = "db")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for EnquiryStatus {
    fn decode(
        value: sqlx::sqlite::SqliteValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Ok(EnquiryStatus::from_raw(raw))
    }
}

/// Enquiry entity (sales lead)
///
/// `is_client == true` ⇔ `client_id` points at an existing client record.
/// That pair is written exactly once, by the conversion engine; contact
/// fields become immutable inputs to identity matching from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Enquiry {
    pub id: i64,
    /// Sequential intake number, rendered as `ENQ-xxxxx`
    pub enquiry_no: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub nationality: Option<String>,
    pub visa_type: Option<String>,
    pub destination_country: Option<String>,
    pub enquiry_source: Option<String>,
    pub branch_id: Option<i64>,
    pub enquiry_status: EnquiryStatus,
    pub assigned_consultant: Option<i64>,
    pub is_client: bool,
    pub client_id: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Enquiry {
    /// Human-readable display code, e.g. `ENQ-01024`.
    pub fn display_code(&self) -> String {
        format!("ENQ-{:05}", self.enquiry_no)
    }
}

/// Create enquiry payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnquiryCreate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub nationality: Option<String>,
    pub visa_type: Option<String>,
    pub destination_country: Option<String>,
    pub enquiry_source: Option<String>,
    pub branch_id: Option<i64>,
    pub enquiry_status: Option<EnquiryStatus>,
    pub assigned_consultant: Option<i64>,
}

/// Update enquiry payload
///
/// Contact-field edits are refused by the handler once the enquiry has
/// been converted; status and classification edits stay open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnquiryUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub nationality: Option<String>,
    pub visa_type: Option<String>,
    pub destination_country: Option<String>,
    pub enquiry_source: Option<String>,
    pub branch_id: Option<i64>,
    pub enquiry_status: Option<EnquiryStatus>,
    pub assigned_consultant: Option<i64>,
}

impl EnquiryUpdate {
    /// Whether this update touches any contact field (the immutable inputs
    /// to identity matching once the enquiry is converted).
    pub fn touches_contact_fields(&self) -> bool {
        self.first_name.is_some()
            || self.last_name.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.alternate_phone.is_some()
            || self.nationality.is_some()
    }
}
