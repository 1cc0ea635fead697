use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDateTime, NaiveTime};

use crate::models::{DailyActivity, RankingEntry, RecordSet};
use crate::period::ResolvedPeriod;

pub const TOP_LIMIT: usize = 5;

/// Bucket for unknown or missing category values. Keeping them counted
/// (instead of dropped) keeps bucket sums equal to the filtered total.
pub const UNSPECIFIED: &str = "unspecified";

const KNOWN_STATUSES: [&str; 3] = ["open", "in_progress", "resolved"];
const KNOWN_SEVERITIES: [&str; 4] = ["critical", "high", "medium", "low"];
const KNOWN_TYPES: [&str; 7] = [
    "phishing",
    "malware",
    "breach",
    "insider_threat",
    "vulnerability",
    "policy_violation",
    "other",
];

#[derive(Debug, Clone, Default)]
pub struct AggregationResult {
    pub total_events: u64,
    pub total_malware: u64,
    pub total_phishing: u64,
    pub status_counts: BTreeMap<String, u64>,
    pub severity_counts: BTreeMap<String, u64>,
    pub type_counts: BTreeMap<String, u64>,
    pub daily: Vec<DailyActivity>,
    pub top_families: Vec<RankingEntry>,
    pub top_senders: Vec<RankingEntry>,
    pub top_targets: Vec<RankingEntry>,
    pub top_actor_groups: Vec<RankingEntry>,
}

impl AggregationResult {
    /// Events not yet resolved (open or in progress).
    pub fn open_events(&self) -> u64 {
        self.status_count("open") + self.status_count("in_progress")
    }

    pub fn resolved_events(&self) -> u64 {
        self.status_count("resolved")
    }

    pub fn critical_high_events(&self) -> u64 {
        self.severity_counts.get("critical").copied().unwrap_or(0)
            + self.severity_counts.get("high").copied().unwrap_or(0)
    }

    fn status_count(&self, status: &str) -> u64 {
        self.status_counts.get(status).copied().unwrap_or(0)
    }
}

/// True when `ts` falls inside the half-open window.
pub fn in_window(ts: NaiveDateTime, window: &ResolvedPeriod) -> bool {
    let start = window.start.and_time(NaiveTime::MIN);
    let end = window.end_exclusive.and_time(NaiveTime::MIN);
    start <= ts && ts < end
}

/// Reduce the three record collections to the report's numbers. Pure:
/// records dated outside the window (or not dated at all) are skipped, and
/// an empty window yields zeros and empty rankings rather than an error.
pub fn aggregate(records: &RecordSet, window: &ResolvedPeriod) -> AggregationResult {
    let events: Vec<_> = records
        .events
        .iter()
        .filter(|e| e.report_date().is_some_and(|ts| in_window(ts, window)))
        .collect();
    let malware: Vec<_> = records
        .malware
        .iter()
        .filter(|m| m.report_date().is_some_and(|ts| in_window(ts, window)))
        .collect();
    let phishing: Vec<_> = records
        .phishing
        .iter()
        .filter(|p| p.report_date().is_some_and(|ts| in_window(ts, window)))
        .collect();

    let mut status_counts = BTreeMap::new();
    let mut severity_counts = BTreeMap::new();
    let mut type_counts = BTreeMap::new();
    for event in &events {
        *status_counts
            .entry(bucket(Some(event.status.as_str()), &KNOWN_STATUSES))
            .or_insert(0) += 1;
        *severity_counts
            .entry(bucket(event.severity.as_deref(), &KNOWN_SEVERITIES))
            .or_insert(0) += 1;
        *type_counts
            .entry(bucket(event.event_type.as_deref(), &KNOWN_TYPES))
            .or_insert(0) += 1;
    }

    let mut per_day: HashMap<chrono::NaiveDate, (u64, u64)> = HashMap::new();
    for record in &malware {
        if let Some(ts) = record.report_date() {
            per_day.entry(ts.date()).or_insert((0, 0)).0 += 1;
        }
    }
    for record in &phishing {
        if let Some(ts) = record.report_date() {
            per_day.entry(ts.date()).or_insert((0, 0)).1 += 1;
        }
    }
    // Dense series: every calendar day of the window, zero-filled, so the
    // chart never has to bridge gaps.
    let mut daily = Vec::with_capacity(window.num_days().max(0) as usize);
    let mut day = window.start;
    while day < window.end_exclusive {
        let (malware_count, phishing_count) = per_day.get(&day).copied().unwrap_or((0, 0));
        daily.push(DailyActivity {
            date: day,
            malware: malware_count,
            phishing: phishing_count,
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let mut families: HashMap<String, u64> = HashMap::new();
    for record in &malware {
        if let Some(family) = non_empty(record.family.as_deref()) {
            *families.entry(family.to_string()).or_insert(0) += 1;
        }
    }

    let mut senders: HashMap<String, u64> = HashMap::new();
    let mut targets: HashMap<String, u64> = HashMap::new();
    for record in &phishing {
        if let Some(sender) = non_empty(record.sender.as_deref()) {
            *senders.entry(sender.to_lowercase()).or_insert(0) += 1;
        }
        if let Some(target) = non_empty(record.target.as_deref()) {
            *targets.entry(target.to_lowercase()).or_insert(0) += 1;
        }
    }

    let mut actor_groups: HashMap<String, u64> = HashMap::new();
    let group_lists = events
        .iter()
        .map(|e| &e.actor_groups)
        .chain(malware.iter().map(|m| &m.actor_groups))
        .chain(phishing.iter().map(|p| &p.actor_groups));
    for groups in group_lists {
        for name in groups {
            if let Some(name) = non_empty(Some(name.as_str())) {
                *actor_groups.entry(name.to_string()).or_insert(0) += 1;
            }
        }
    }

    AggregationResult {
        total_events: events.len() as u64,
        total_malware: malware.len() as u64,
        total_phishing: phishing.len() as u64,
        status_counts,
        severity_counts,
        type_counts,
        daily,
        top_families: ranked(families),
        top_senders: ranked(senders),
        top_targets: ranked(targets),
        top_actor_groups: ranked(actor_groups),
    }
}

fn bucket(value: Option<&str>, known: &[&str]) -> String {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) if known.contains(&v.as_str()) => v,
        _ => UNSPECIFIED.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Count descending, ties broken by ascending label, top five only.
fn ranked(counts: HashMap<String, u64>) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = counts
        .into_iter()
        .map(|(label, count)| RankingEntry { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(TOP_LIMIT);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventRecord, MalwareRecord, PhishingRecord};
    use crate::period::{resolve, PeriodSpec};
    use chrono::{NaiveDate, NaiveDateTime};
    use uuid::Uuid;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn window_jan_2026() -> crate::period::ResolvedPeriod {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        resolve(&PeriodSpec::Month { month: 1, year: 2026 }, today).unwrap()
    }

    fn event(status: &str, severity: Option<&str>, when: Option<NaiveDateTime>) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            title: "suspicious login".to_string(),
            description: None,
            severity: severity.map(str::to_string),
            event_type: Some("breach".to_string()),
            status: status.to_string(),
            event_date: when,
            created_at: None,
            actor_groups: Vec::new(),
        }
    }

    fn malware(family: Option<&str>, when: NaiveDateTime, groups: &[&str]) -> MalwareRecord {
        MalwareRecord {
            id: Uuid::new_v4(),
            name: "sample".to_string(),
            family: family.map(str::to_string),
            description: None,
            occurrence_date: Some(when),
            created_at: None,
            actor_groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn phish(sender: Option<&str>, target: Option<&str>, when: NaiveDateTime) -> PhishingRecord {
        PhishingRecord {
            id: Uuid::new_v4(),
            subject: Some("invoice overdue".to_string()),
            sender: sender.map(str::to_string),
            target: target.map(str::to_string),
            description: None,
            occurrence_date: Some(when),
            created_at: None,
            actor_groups: Vec::new(),
        }
    }

    #[test]
    fn bucket_sums_match_filtered_total() {
        let window = window_jan_2026();
        let records = RecordSet {
            events: vec![
                event("open", Some("critical"), Some(ts(2026, 1, 5))),
                event("resolved", Some("low"), Some(ts(2026, 1, 10))),
                event("escalated", None, Some(ts(2026, 1, 12))),
                event("open", Some("high"), Some(ts(2026, 3, 1))), // outside window
            ],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.total_events, 3);
        assert_eq!(agg.status_counts.values().sum::<u64>(), 3);
        assert_eq!(agg.severity_counts.values().sum::<u64>(), 3);
        assert_eq!(agg.type_counts.values().sum::<u64>(), 3);
        // unknown status and missing severity both land in "unspecified"
        assert_eq!(agg.status_counts.get(UNSPECIFIED), Some(&1));
        assert_eq!(agg.severity_counts.get(UNSPECIFIED), Some(&1));
    }

    #[test]
    fn daily_series_is_dense_over_the_window() {
        let window = window_jan_2026();
        let records = RecordSet {
            malware: vec![malware(Some("Emotet"), ts(2026, 1, 3), &[])],
            phishing: vec![phish(Some("a@b.test"), None, ts(2026, 1, 3))],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.daily.len(), 31);
        assert_eq!(agg.daily[2].malware, 1);
        assert_eq!(agg.daily[2].phishing, 1);
        assert!(agg.daily.iter().filter(|d| d.malware == 0).count() >= 30);
        assert_eq!(agg.daily[0].date, window.start);
    }

    #[test]
    fn window_boundaries_are_half_open() {
        let window = window_jan_2026();
        let records = RecordSet {
            events: vec![
                event("open", None, Some(midnight(2026, 1, 1))), // exactly at start
                event("open", None, Some(midnight(2026, 2, 1))), // exactly at end_exclusive
            ],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.total_events, 1);
    }

    #[test]
    fn dateless_records_are_skipped() {
        let window = window_jan_2026();
        let records = RecordSet {
            events: vec![
                event("open", None, None),
                event("open", None, Some(ts(2026, 1, 8))),
            ],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.total_events, 1);
    }

    #[test]
    fn creation_date_backfills_missing_occurrence() {
        let window = window_jan_2026();
        let mut record = malware(Some("Qakbot"), ts(2026, 1, 9), &[]);
        record.occurrence_date = None;
        record.created_at = Some(ts(2026, 1, 9));
        let records = RecordSet {
            malware: vec![record],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.total_malware, 1);
        assert_eq!(agg.top_families[0].label, "Qakbot");
    }

    #[test]
    fn rankings_sort_by_count_then_label_and_truncate() {
        let window = window_jan_2026();
        let mut malware_records = vec![
            malware(Some("Emotet"), ts(2026, 1, 2), &[]),
            malware(Some("Emotet"), ts(2026, 1, 3), &[]),
            malware(Some("Agent Tesla"), ts(2026, 1, 4), &[]),
            malware(Some("Qakbot"), ts(2026, 1, 4), &[]),
        ];
        for (i, family) in ["Lokibot", "Mirai", "NanoCore", "Remcos"].into_iter().enumerate() {
            malware_records.push(malware(Some(family), ts(2026, 1, 5 + i as u32), &[]));
        }
        let records = RecordSet {
            malware: malware_records,
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.top_families.len(), TOP_LIMIT);
        assert_eq!(agg.top_families[0].label, "Emotet");
        assert_eq!(agg.top_families[0].count, 2);
        // ties at count 1 come out alphabetically
        assert_eq!(agg.top_families[1].label, "Agent Tesla");
        assert_eq!(agg.top_families[2].label, "Lokibot");
    }

    #[test]
    fn senders_and_targets_are_normalized() {
        let window = window_jan_2026();
        let records = RecordSet {
            phishing: vec![
                phish(Some("Billing@Corp.Test"), Some("Finance"), ts(2026, 1, 2)),
                phish(Some("billing@corp.test"), Some("finance"), ts(2026, 1, 3)),
                phish(Some("  "), None, ts(2026, 1, 4)),
            ],
            ..Default::default()
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.top_senders.len(), 1);
        assert_eq!(agg.top_senders[0].label, "billing@corp.test");
        assert_eq!(agg.top_senders[0].count, 2);
        assert_eq!(agg.top_targets[0].count, 2);
    }

    #[test]
    fn actor_groups_union_all_collections() {
        let window = window_jan_2026();
        let mut event_record = event("open", None, Some(ts(2026, 1, 2)));
        event_record.actor_groups = vec!["APT28".to_string()];
        let mut phish_record = phish(Some("x@y.test"), None, ts(2026, 1, 3));
        phish_record.actor_groups = vec!["APT28".to_string(), "FIN7".to_string()];
        let records = RecordSet {
            events: vec![event_record],
            malware: vec![malware(None, ts(2026, 1, 4), &["APT28"])],
            phishing: vec![phish_record],
        };

        let agg = aggregate(&records, &window);
        assert_eq!(agg.top_actor_groups[0].label, "APT28");
        assert_eq!(agg.top_actor_groups[0].count, 3);
        assert_eq!(agg.top_actor_groups[1].label, "FIN7");
    }

    #[test]
    fn empty_window_is_not_an_error() {
        let window = window_jan_2026();
        let agg = aggregate(&RecordSet::default(), &window);
        assert_eq!(agg.total_events, 0);
        assert_eq!(agg.daily.len(), 31);
        assert!(agg.daily.iter().all(|d| d.malware == 0 && d.phishing == 0));
        assert!(agg.top_families.is_empty());
        assert!(agg.top_actor_groups.is_empty());
        assert_eq!(agg.open_events(), 0);
    }
}
