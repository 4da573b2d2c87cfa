//! Mapping from stored records to the remote spreadsheet columns.
//!
//! The remote tables have no null: every optional field is sent as `""`.
//! Timestamps are stored in UTC and shown in the office's local zone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use frontdesk_core::{CheckinEvent, MailRecord, SyncableRecord};

/// Value of the `Status` column for freshly synced check-ins.
pub const INITIAL_WORK_STATUS: &str = "Not started";

/// One row of the check-in table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckinRow {
    #[serde(rename = "EventID")]
    pub event_id: String,
    pub timestamp_local: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub professional: String,
    pub intake_type: String,
    pub due_date: String,
    pub status: String,
    pub notes: String,
}

/// One row of the mail log table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailRow {
    #[serde(rename = "EventID")]
    pub event_id: String,
    pub date_sent: String,
    pub client_name: String,
    pub professional: String,
    pub item_type: String,
    pub method: String,
    pub tracking_number: String,
    pub sent_by: String,
    pub notes: String,
}

/// Flat JSON body for either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RowPayload {
    Checkin(CheckinRow),
    Mail(MailRow),
}

impl RowPayload {
    pub fn event_id(&self) -> &str {
        match self {
            RowPayload::Checkin(row) => &row.event_id,
            RowPayload::Mail(row) => &row.event_id,
        }
    }
}

pub fn build(record: &SyncableRecord, tz: Tz) -> RowPayload {
    match record {
        SyncableRecord::Checkin(event) => RowPayload::Checkin(checkin_row(event, tz)),
        SyncableRecord::Mail(mail) => RowPayload::Mail(mail_row(mail, tz)),
    }
}

pub fn checkin_row(event: &CheckinEvent, tz: Tz) -> CheckinRow {
    CheckinRow {
        event_id: event.id.to_string(),
        timestamp_local: local_timestamp(event.created_at, tz),
        client_name: event.client_name.clone(),
        client_email: text(&event.client_email),
        client_phone: text(&event.client_phone),
        professional: event.staff.name.clone(),
        intake_type: event.intake_type.label().to_string(),
        due_date: event.due_date.map(format_date).unwrap_or_default(),
        status: INITIAL_WORK_STATUS.to_string(),
        notes: text(&event.notes),
    }
}

pub fn mail_row(mail: &MailRecord, tz: Tz) -> MailRow {
    MailRow {
        event_id: mail.id.to_string(),
        date_sent: local_date(mail.created_at, tz),
        client_name: mail.client_name.clone(),
        professional: mail.staff.name.clone(),
        item_type: mail.item_type.label().to_string(),
        method: mail.method.label().to_string(),
        tracking_number: text(&mail.tracking_number),
        sent_by: text(&mail.sent_by),
        notes: text(&mail.notes),
    }
}

/// `YYYY-MM-DD HH:MM:SS` in `tz`.
pub fn local_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `YYYY-MM-DD` of the local calendar day in `tz`.
pub fn local_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use frontdesk_core::{
        DeliveryMethod, IntakeType, MailItemType, RecordId, StaffRef, SyncEnvelope,
    };
    use serde_json::json;

    use super::*;

    fn checkin() -> CheckinEvent {
        CheckinEvent {
            id: RecordId::from("7f1c2a9e-0000-4000-8000-000000000001"),
            client_name: "Ada Lovelace".into(),
            staff: StaffRef::new("Jane Doe").with_id(2),
            client_email: None,
            client_phone: Some("555-0100".into()),
            intake_type: IntakeType::DropOff,
            due_date: None,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 5).unwrap(),
            sync: SyncEnvelope::default(),
        }
    }

    fn mail() -> MailRecord {
        MailRecord {
            id: RecordId::from("7f1c2a9e-0000-4000-8000-000000000002"),
            client_name: "Ada Lovelace".into(),
            staff: StaffRef::new("John Smith"),
            item_type: MailItemType::OriginalReturn,
            method: DeliveryMethod::UspsCertified,
            tracking_number: None,
            sent_by: Some("KL".into()),
            notes: None,
            // 02:00 UTC is still the previous evening in New York.
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap(),
            sync: SyncEnvelope::default(),
        }
    }

    #[test]
    fn checkin_payload_uses_remote_column_names() {
        let payload = build(&SyncableRecord::Checkin(checkin()), New_York);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "EventID": "7f1c2a9e-0000-4000-8000-000000000001",
                "TimestampLocal": "2024-03-15 14:30:05",
                "ClientName": "Ada Lovelace",
                "ClientEmail": "",
                "ClientPhone": "555-0100",
                "Professional": "Jane Doe",
                "IntakeType": "Drop-off",
                "DueDate": "",
                "Status": "Not started",
                "Notes": "",
            })
        );
    }

    #[test]
    fn mail_payload_uses_local_calendar_day() {
        let payload = build(&SyncableRecord::Mail(mail()), New_York);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "EventID": "7f1c2a9e-0000-4000-8000-000000000002",
                "DateSent": "2024-01-09",
                "ClientName": "Ada Lovelace",
                "Professional": "John Smith",
                "ItemType": "Original Return",
                "Method": "USPS Certified",
                "TrackingNumber": "",
                "SentBy": "KL",
                "Notes": "",
            })
        );
    }

    #[test]
    fn due_date_is_formatted_as_plain_date() {
        let mut event = checkin();
        event.due_date = NaiveDate::from_ymd_opt(2024, 3, 15);
        let row = checkin_row(&event, New_York);
        assert_eq!(row.due_date, "2024-03-15");
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["DueDate"], json!("2024-03-15"));
    }

    #[test]
    fn no_field_serializes_as_null() {
        let value = serde_json::to_value(build(&SyncableRecord::Mail(mail()), New_York)).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.values().all(|v| v.is_string()), "{value}");
    }

    #[test]
    fn local_timestamp_follows_daylight_saving() {
        // EST (UTC-5) in January, EDT (UTC-4) in July.
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 17, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 17, 0, 0).unwrap();
        assert_eq!(local_timestamp(winter, New_York), "2024-01-15 12:00:00");
        assert_eq!(local_timestamp(summer, New_York), "2024-07-15 13:00:00");
        assert_eq!(local_timestamp(summer, chrono_tz::UTC), "2024-07-15 17:00:00");
    }
}
