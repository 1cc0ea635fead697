use chrono::NaiveDate;

use crate::aggregate;
use crate::chart;
use crate::error::ReportError;
use crate::models::RecordSet;
use crate::period::{self, PeriodSpec};
use crate::report::{self, Audience, Document};
use crate::risk;

/// One report invocation: resolve the window, reduce the records, render
/// the trend chart, compose the audience variant. Stateless; safe to call
/// repeatedly and concurrently.
pub fn generate(
    audience: &str,
    spec: &PeriodSpec,
    today: NaiveDate,
    records: &RecordSet,
) -> Result<Document, ReportError> {
    let audience = Audience::from_key(audience)?;
    let window = period::resolve(spec, today)?;
    let agg = aggregate::aggregate(records, &window);
    let fragment = chart::render(&agg.daily);
    let posture = risk::assess(&records.events, &window);
    Ok(report::compose(
        audience, &window, &agg, &fragment, &posture, today,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventRecord;
    use chrono::NaiveDateTime;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(10, 0, 0)
    }

    fn event(status: &str, severity: &str, when: Option<NaiveDateTime>) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            title: "event".to_string(),
            description: None,
            severity: Some(severity.to_string()),
            event_type: Some("other".to_string()),
            status: status.to_string(),
            event_date: when,
            created_at: None,
            actor_groups: Vec::new(),
        }
    }

    /// 47 events, 12 not resolved, 35 resolved, 8 critical or high.
    fn scenario_events() -> Vec<EventRecord> {
        let mut events = Vec::new();
        for _ in 0..5 {
            events.push(event("open", "critical", ts(2026, 3, 2)));
        }
        for _ in 0..3 {
            events.push(event("in_progress", "high", ts(2026, 3, 4)));
        }
        for _ in 0..4 {
            events.push(event("open", "medium", ts(2026, 3, 6)));
        }
        for _ in 0..35 {
            events.push(event("resolved", "low", ts(2026, 3, 8)));
        }
        events
    }

    #[test]
    fn executive_fixed_window_shows_exact_metrics() {
        let records = RecordSet {
            events: scenario_events(),
            ..Default::default()
        };
        let doc = generate(
            "exec",
            &PeriodSpec::FixedDays { days: 30 },
            today(),
            &records,
        )
        .unwrap();

        assert!(doc.html.contains("Last 30 Days"));
        assert!(doc.html.contains("Total events: <span class='metric-value'>47</span>"));
        assert!(doc.html.contains("Open: <span class='metric-value'>12</span>"));
        assert!(doc.html.contains("Resolved: <span class='metric-value'>35</span>"));
        assert!(doc.html.contains("Critical & high severity: <span class='metric-value'>8</span>"));
        assert_eq!(doc.filename, "ThreatReport_exec_Last30Days_2026-03-15.html");
    }

    #[test]
    fn technical_month_report_covers_dense_january() {
        let spec = PeriodSpec::Month { month: 1, year: 2026 };
        let doc = generate("it", &spec, today(), &RecordSet::default()).unwrap();
        assert!(doc.html.contains("January 2026"));
        assert!(doc.html.contains("<svg"));

        let window = period::resolve(&spec, today()).unwrap();
        let agg = aggregate::aggregate(&RecordSet::default(), &window);
        assert_eq!(agg.daily.len(), 31);
    }

    #[test]
    fn end_user_quarter_report_omits_chart_and_actors() {
        let mut record = event("open", "high", ts(2026, 5, 10));
        record.actor_groups = vec!["APT28".to_string()];
        let records = RecordSet {
            events: vec![record],
            ..Default::default()
        };
        let doc = generate(
            "users",
            &PeriodSpec::Quarter { quarter: 2, year: 2026 },
            today(),
            &records,
        )
        .unwrap();

        assert!(doc.html.contains("Q2 2026"));
        assert!(!doc.html.contains("<svg"));
        assert!(!doc.html.contains("id='actor-alerts'"));
        assert!(!doc.html.contains("APT28"));
    }

    #[test]
    fn bad_inputs_are_rejected_up_front() {
        let records = RecordSet::default();
        let err = generate(
            "board",
            &PeriodSpec::FixedDays { days: 30 },
            today(),
            &records,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::UnknownAudience { .. }));

        let err = generate(
            "exec",
            &PeriodSpec::Month { month: 13, year: 2026 },
            today(),
            &records,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidPeriod { .. }));
    }

    #[test]
    fn empty_dataset_still_yields_a_document() {
        let doc = generate(
            "exec",
            &PeriodSpec::FixedDays { days: 30 },
            today(),
            &RecordSet::default(),
        )
        .unwrap();
        assert!(doc.html.contains("Total events: <span class='metric-value'>0</span>"));
        assert!(doc.html.contains("No data in this period."));
    }
}
