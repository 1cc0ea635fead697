use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

/// Security incident event as stored in the record store.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub event_type: Option<String>,
    pub status: String,
    pub event_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub actor_groups: Vec<String>,
}

/// Malware instance, optionally tied to a family.
#[derive(Debug, Clone, Serialize)]
pub struct MalwareRecord {
    pub id: Uuid,
    pub name: String,
    pub family: Option<String>,
    pub description: Option<String>,
    pub occurrence_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub actor_groups: Vec<String>,
}

/// Phishing instance with sender and targeted recipient.
#[derive(Debug, Clone, Serialize)]
pub struct PhishingRecord {
    pub id: Uuid,
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub target: Option<String>,
    pub description: Option<String>,
    pub occurrence_date: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub actor_groups: Vec<String>,
}

/// The three record collections one report invocation works from.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub events: Vec<EventRecord>,
    pub malware: Vec<MalwareRecord>,
    pub phishing: Vec<PhishingRecord>,
}

impl EventRecord {
    /// Date the event is reported under: occurrence first, creation as
    /// fallback. `None` marks a malformed record.
    pub fn report_date(&self) -> Option<NaiveDateTime> {
        self.event_date.or(self.created_at)
    }
}

impl MalwareRecord {
    pub fn report_date(&self) -> Option<NaiveDateTime> {
        self.occurrence_date.or(self.created_at)
    }
}

impl PhishingRecord {
    pub fn report_date(&self) -> Option<NaiveDateTime> {
        self.occurrence_date.or(self.created_at)
    }
}

/// One day of the dense trend series: malware and phishing counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub malware: u64,
    pub phishing: u64,
}

/// A ranked label with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    pub label: String,
    pub count: u64,
}
