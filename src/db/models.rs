//! Row types and value enums for the intake tables
//!
//! Enum columns are stored as their snake_case text form and parsed back on
//! read, so a row that leaves the repository always carries a known value.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::IntakeError;

/// Deserialize a present key into `Some`, including an explicit `null`.
///
/// Pair with `#[serde(default)]` on an `Option<Option<T>>` field so an absent
/// key stays `None` while `null` becomes `Some(None)`.
pub fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Current UTC timestamp as ISO 8601 text with millisecond precision.
///
/// Fixed width, so lexical order in SQLite matches time order.
pub fn current_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

// ============================================================================
// Enum columns
// ============================================================================

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = IntakeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(IntakeError::validation(
                        $label,
                        format!("Invalid {} '{}'", $label, other),
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse::<$name>()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum! {
    /// Workflow status of a client request
    RequestStatus, "status" {
        Pending => "pending",
        UnderReview => "under_review",
        Accepted => "accepted",
        Denied => "denied",
        Completed => "completed",
    }
}

text_enum! {
    /// Whether the client is opening a new matter or updating an existing one
    RequestType, "request_type" {
        New => "new",
        Update => "update",
    }
}

text_enum! {
    #[derive(Default)]
    Priority, "priority" {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Identity directory entry mirrored from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: String,
}

/// One advocacy profile per client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfileRow {
    pub id: i64,
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub advocacy_needs: Option<String>,
    pub case_status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Client request row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequestRow {
    pub id: i64,
    pub user_id: String,
    pub request_type: RequestType,
    pub title: String,
    pub scope_of_enquiry: String,
    pub timeframe: Option<String>,
    pub priority: Priority,
    pub notes: Option<String>,
    /// Attachment descriptors, in submission order
    pub documents: Vec<serde_json::Value>,
    pub related_request_id: Option<i64>,
    pub admin_notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: String,
    pub updated_at: String,
    pub reviewed_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Profile fields as seen through the admin listing's left join
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub advocacy_needs: Option<String>,
    pub case_status: Option<String>,
}

/// Owner of a request in the admin listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOwner {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile: JoinedProfile,
}

/// Request joined with its owner, for admin review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRequestView {
    #[serde(flatten)]
    pub request: ClientRequestRow,
    pub user: RequestOwner,
}

/// Request counts for the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub total: u64,
    pub pending: u64,
    pub under_review: u64,
    pub accepted: u64,
    pub denied: u64,
    pub completed: u64,
}

impl RequestStats {
    /// Record `count` requests in `status`
    pub fn add(&mut self, status: RequestStatus, count: u64) {
        let slot = match status {
            RequestStatus::Pending => &mut self.pending,
            RequestStatus::UnderReview => &mut self.under_review,
            RequestStatus::Accepted => &mut self.accepted,
            RequestStatus::Denied => &mut self.denied,
            RequestStatus::Completed => &mut self.completed,
        };
        *slot += count;
        self.total += count;
    }
}
