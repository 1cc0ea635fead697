use crate::aggregate::in_window;
use crate::models::EventRecord;
use crate::period::ResolvedPeriod;

/// Severity-weighted posture over the window's active events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskSummary {
    pub score: u32,
    pub level: &'static str,
    pub active_events: usize,
    pub open: usize,
    pub in_progress: usize,
}

pub fn severity_weight(severity: Option<&str>) -> u32 {
    match severity.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("critical") => 5,
        Some("high") => 3,
        Some("medium") => 2,
        Some("low") => 1,
        _ => 0,
    }
}

pub fn level_for(score: u32) -> &'static str {
    match score {
        0..=6 => "Low",
        7..=14 => "Medium",
        15..=25 => "High",
        _ => "Critical",
    }
}

/// Sum severity weights over events that are still active (open or in
/// progress) and dated inside the window.
pub fn assess(events: &[EventRecord], window: &ResolvedPeriod) -> RiskSummary {
    let mut score = 0u32;
    let mut open = 0usize;
    let mut in_progress = 0usize;

    for event in events {
        if !event.report_date().is_some_and(|ts| in_window(ts, window)) {
            continue;
        }
        match event.status.trim().to_lowercase().as_str() {
            "open" => open += 1,
            "in_progress" => in_progress += 1,
            _ => continue,
        }
        score += severity_weight(event.severity.as_deref());
    }

    RiskSummary {
        score,
        level: level_for(score),
        active_events: open + in_progress,
        open,
        in_progress,
    }
}
