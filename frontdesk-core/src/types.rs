//! Domain types for front-desk records.
//!
//! Every record is an immutable creation payload plus a [`SyncEnvelope`],
//! which is the only part that changes after insert.
//! Enum labels are the exact strings persisted in the store and sent to the
//! remote spreadsheet columns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Globally unique record identifier, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// A fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// First eight characters, as shown in confirmation messages.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The staff member a client is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRef {
    /// Back-reference into the staff directory, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
}

impl StaffRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Error returned when a label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'; expected one of: {}", .expected.join(", "))]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

/// Lowercase, alphanumeric-only form used to compare labels and slugs.
fn fold(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Declares a label-backed enum: `label()`, `ALL`, `Display`, `FromStr`, and
/// serde as the label string.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            const LABELS: &'static [&'static str] = &[$($label),+];

            /// Display label, as persisted and sent to the remote columns.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = fold(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| fold(v.label()) == wanted)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: Self::LABELS,
                    })
            }
        }
    };
}

labelled_enum! {
    /// How a client's paperwork arrived.
    IntakeType, "intake type" {
        Appointment => "Appointment",
        WalkIn => "Walk-in",
        DropOff => "Drop-off",
        Email => "Email",
        PortalUpload => "Portal Upload",
        MailIn => "Mail-in",
    }
}

labelled_enum! {
    /// What was sent to the client.
    MailItemType, "item type" {
        OriginalReturn => "Original Return",
        AmendedReturn => "Amended Return",
        EfileAuthorization => "E-file Authorization",
        NoticeResponse => "Notice Response",
        Other => "Other",
    }
}

labelled_enum! {
    /// How it was sent.
    DeliveryMethod, "delivery method" {
        Usps => "USPS",
        UspsCertified => "USPS Certified",
        FedEx => "FedEx",
        Ups => "UPS",
        HandDelivered => "Hand-delivered",
        PortalUpload => "Portal Upload",
    }
}

impl Default for IntakeType {
    fn default() -> Self {
        IntakeType::Appointment
    }
}

impl Default for MailItemType {
    fn default() -> Self {
        MailItemType::Other
    }
}

impl Default for DeliveryMethod {
    fn default() -> Self {
        DeliveryMethod::Usps
    }
}

/// Remote sync state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncStatus::Pending),
            "success" => Some(SyncStatus::Success),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Checkin,
    Mail,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Checkin, RecordKind::Mail];

    /// Human label used in log lines.
    pub fn noun(self) -> &'static str {
        match self {
            RecordKind::Checkin => "check-in",
            RecordKind::Mail => "mail record",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Checkin => write!(f, "checkin"),
            RecordKind::Mail => write!(f, "mail"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync envelope
// ---------------------------------------------------------------------------

/// The mutable part of a record.
///
/// `last_error` is `None` whenever `status` is `Success` and `Some` whenever
/// it is `Failed`. `synced_at` is only ever set by a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SyncEnvelope {
    pub status: SyncStatus,
    pub last_error: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A client arrival or desk intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinEvent {
    pub id: RecordId,
    pub client_name: String,
    pub staff: StaffRef,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub intake_type: IntakeType,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sync: SyncEnvelope,
}

/// An outbound mail/document log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    pub id: RecordId,
    pub client_name: String,
    pub staff: StaffRef,
    pub item_type: MailItemType,
    pub method: DeliveryMethod,
    pub tracking_number: Option<String>,
    pub sent_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sync: SyncEnvelope,
}

/// Either record kind, as handed to the sync client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncableRecord {
    Checkin(CheckinEvent),
    Mail(MailRecord),
}

impl SyncableRecord {
    pub fn id(&self) -> &RecordId {
        match self {
            SyncableRecord::Checkin(c) => &c.id,
            SyncableRecord::Mail(m) => &m.id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            SyncableRecord::Checkin(_) => RecordKind::Checkin,
            SyncableRecord::Mail(_) => RecordKind::Mail,
        }
    }

    pub fn client_name(&self) -> &str {
        match self {
            SyncableRecord::Checkin(c) => &c.client_name,
            SyncableRecord::Mail(m) => &m.client_name,
        }
    }

    pub fn staff(&self) -> &StaffRef {
        match self {
            SyncableRecord::Checkin(c) => &c.staff,
            SyncableRecord::Mail(m) => &m.staff,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            SyncableRecord::Checkin(c) => c.created_at,
            SyncableRecord::Mail(m) => m.created_at,
        }
    }

    pub fn envelope(&self) -> &SyncEnvelope {
        match self {
            SyncableRecord::Checkin(c) => &c.sync,
            SyncableRecord::Mail(m) => &m.sync,
        }
    }
}

impl From<CheckinEvent> for SyncableRecord {
    fn from(c: CheckinEvent) -> Self {
        SyncableRecord::Checkin(c)
    }
}

impl From<MailRecord> for SyncableRecord {
    fn from(m: MailRecord) -> Self {
        SyncableRecord::Mail(m)
    }
}

// ---------------------------------------------------------------------------
// Creation payloads
// ---------------------------------------------------------------------------

/// Fields supplied by the submitter of a check-in; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCheckin {
    pub client_name: String,
    pub staff_name: String,
    pub staff_id: Option<i64>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub intake_type: IntakeType,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fields supplied by the submitter of a mail log entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMailRecord {
    pub client_name: String,
    pub staff_name: String,
    pub staff_id: Option<i64>,
    pub item_type: MailItemType,
    pub method: DeliveryMethod,
    pub tracking_number: Option<String>,
    pub sent_by: Option<String>,
    pub notes: Option<String>,
}

/// Trim a form value, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
