use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate::AggregationResult;
use crate::chart::ChartFragment;
use crate::error::ReportError;
use crate::models::RankingEntry;
use crate::period::ResolvedPeriod;
use crate::risk::RiskSummary;

pub const FILENAME_PREFIX: &str = "ThreatReport";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Executive,
    Technical,
    EndUser,
}

impl Audience {
    pub fn from_key(key: &str) -> Result<Self, ReportError> {
        match key.trim().to_lowercase().as_str() {
            "exec" => Ok(Audience::Executive),
            "it" => Ok(Audience::Technical),
            "users" => Ok(Audience::EndUser),
            _ => Err(ReportError::UnknownAudience {
                value: key.trim().to_string(),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Audience::Executive => "exec",
            Audience::Technical => "it",
            Audience::EndUser => "users",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Audience::Executive => "Security Report — Executive Summary",
            Audience::Technical => "Security Report — Technical Detail",
            Audience::EndUser => "Security Awareness Update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Full,
    Summary,
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recommendations {
    Strategic,
    Technical,
    Omit,
}

/// Fixed section-inclusion table keyed by audience. The composer only
/// consults this plan; it never branches on audience anywhere else.
struct SectionPlan {
    metrics: Depth,
    trend_chart: bool,
    breakdown: Depth,
    rankings: Depth,
    actor_alerts: bool,
    awareness: bool,
    recommendations: Recommendations,
}

const fn plan_for(audience: Audience) -> SectionPlan {
    match audience {
        Audience::Executive => SectionPlan {
            metrics: Depth::Full,
            trend_chart: true,
            breakdown: Depth::Summary,
            rankings: Depth::Full,
            actor_alerts: true,
            awareness: false,
            recommendations: Recommendations::Strategic,
        },
        Audience::Technical => SectionPlan {
            metrics: Depth::Full,
            trend_chart: true,
            breakdown: Depth::Full,
            rankings: Depth::Full,
            actor_alerts: false,
            awareness: false,
            recommendations: Recommendations::Technical,
        },
        Audience::EndUser => SectionPlan {
            metrics: Depth::Summary,
            trend_chart: false,
            breakdown: Depth::Omit,
            rankings: Depth::Summary,
            actor_alerts: false,
            awareness: true,
            recommendations: Recommendations::Omit,
        },
    }
}

/// Finished report: one self-contained HTML string plus the filename the
/// caller should save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub html: String,
    pub filename: String,
}

const NO_DATA: &str = "No data in this period.";

pub fn compose(
    audience: Audience,
    window: &ResolvedPeriod,
    agg: &AggregationResult,
    chart: &ChartFragment,
    risk: &RiskSummary,
    generated_on: NaiveDate,
) -> Document {
    let plan = plan_for(audience);
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang='en'>");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset='utf-8'/>");
    let _ = writeln!(html, "<title>{}</title>", audience.title());
    let _ = writeln!(html, "<style>{}</style>", STYLE);
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");

    let _ = writeln!(html, "<header>");
    let _ = writeln!(html, "<h1>{}</h1>", audience.title());
    let _ = writeln!(
        html,
        "<p class='period'>Reporting period: {} · Generated {}</p>",
        escape_html(&window.label),
        generated_on.format("%Y-%m-%d")
    );
    let _ = writeln!(html, "</header>");

    write_metrics(&mut html, plan.metrics, audience, agg, risk);

    if plan.trend_chart {
        let _ = writeln!(html, "<section id='trend-chart'>");
        let _ = writeln!(html, "<h2>Malware & Phishing Trend</h2>");
        if agg.daily.is_empty() {
            let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
        }
        let _ = writeln!(html, "{}", chart.svg.trim_end());
        let _ = writeln!(html, "</section>");
    }

    match plan.breakdown {
        Depth::Full => write_breakdown_full(&mut html, agg),
        Depth::Summary => write_breakdown_summary(&mut html, agg),
        Depth::Omit => {}
    }

    match plan.rankings {
        Depth::Full => write_rankings_full(&mut html, agg),
        Depth::Summary => write_top_threat(&mut html, agg),
        Depth::Omit => {}
    }

    if plan.actor_alerts {
        write_actor_alerts(&mut html, agg);
    }

    if plan.awareness {
        write_awareness(&mut html);
    }

    match plan.recommendations {
        Recommendations::Strategic => write_recommendations_strategic(&mut html, agg),
        Recommendations::Technical => write_recommendations_technical(&mut html, agg),
        Recommendations::Omit => {}
    }

    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");

    Document {
        filename: format!(
            "{FILENAME_PREFIX}_{}_{}_{}.html",
            audience.key(),
            period_token(&window.label),
            generated_on.format("%Y-%m-%d")
        ),
        html,
    }
}

/// Period token for filenames: the resolved label stripped to
/// alphanumerics ("Last 30 Days" -> "Last30Days").
fn period_token(label: &str) -> String {
    label.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn write_metrics(
    html: &mut String,
    depth: Depth,
    audience: Audience,
    agg: &AggregationResult,
    risk: &RiskSummary,
) {
    let _ = writeln!(html, "<section id='key-metrics'>");
    let _ = writeln!(html, "<h2>Key Metrics</h2>");
    match depth {
        Depth::Full => {
            let _ = writeln!(html, "<ul class='metrics'>");
            metric_item(html, "Total events", agg.total_events);
            metric_item(html, "Open", agg.open_events());
            metric_item(html, "Resolved", agg.resolved_events());
            metric_item(html, "Critical & high severity", agg.critical_high_events());
            let _ = writeln!(html, "</ul>");
            if audience == Audience::Executive {
                let _ = writeln!(
                    html,
                    "<p class='risk'>Risk posture: <strong>{}</strong> (score {}, {} active events)</p>",
                    risk.level, risk.score, risk.active_events
                );
            }
        }
        Depth::Summary => {
            if agg.total_events == 0 {
                let _ = writeln!(
                    html,
                    "<p>No security events were recorded in this period. Keep up the good habits below.</p>"
                );
            } else {
                let _ = writeln!(
                    html,
                    "<p>We tracked {} security events this period; {} are resolved and {} are still being worked on.</p>",
                    agg.total_events,
                    agg.resolved_events(),
                    agg.open_events()
                );
            }
        }
        Depth::Omit => {}
    }
    let _ = writeln!(html, "</section>");
}

fn metric_item(html: &mut String, label: &str, value: u64) {
    let _ = writeln!(
        html,
        "<li>{label}: <span class='metric-value'>{value}</span></li>"
    );
}

fn write_breakdown_summary(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='breakdown'>");
    let _ = writeln!(html, "<h2>Severity Overview</h2>");
    if agg.total_events == 0 {
        let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
    } else {
        let line = ["critical", "high", "medium", "low", "unspecified"]
            .iter()
            .map(|key| {
                format!(
                    "{}: {}",
                    display_label(key),
                    agg.severity_counts.get(*key).copied().unwrap_or(0)
                )
            })
            .collect::<Vec<_>>()
            .join(" · ");
        let _ = writeln!(html, "<p>{line}</p>");
    }
    let _ = writeln!(html, "</section>");
}

fn write_breakdown_full(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='breakdown'>");
    let _ = writeln!(html, "<h2>Status, Severity & Type Breakdown</h2>");
    if agg.total_events == 0 {
        let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
    } else {
        count_table(html, "By status", &agg.status_counts);
        count_table(html, "By severity", &agg.severity_counts);
        count_table(html, "By type", &agg.type_counts);
    }
    let _ = writeln!(html, "</section>");
}

fn count_table(html: &mut String, caption: &str, counts: &std::collections::BTreeMap<String, u64>) {
    let _ = writeln!(html, "<table><caption>{caption}</caption>");
    let _ = writeln!(html, "<tr><th>Category</th><th>Count</th></tr>");
    for (key, count) in counts {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{count}</td></tr>",
            escape_html(&display_label(key))
        );
    }
    let _ = writeln!(html, "</table>");
}

fn write_rankings_full(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='rankings'>");
    let _ = writeln!(html, "<h2>Top 5 Rankings</h2>");
    ranking_list(html, "Malware families", &agg.top_families);
    ranking_list(html, "Phishing senders", &agg.top_senders);
    ranking_list(html, "Targeted areas", &agg.top_targets);
    ranking_list(html, "Threat actor groups", &agg.top_actor_groups);
    let _ = writeln!(html, "</section>");
}

fn ranking_list(html: &mut String, title: &str, entries: &[RankingEntry]) {
    let _ = writeln!(html, "<h3>{title}</h3>");
    if entries.is_empty() {
        let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
        return;
    }
    let _ = writeln!(html, "<ol>");
    for entry in entries {
        let _ = writeln!(
            html,
            "<li>{} ({})</li>",
            escape_html(&entry.label),
            entry.count
        );
    }
    let _ = writeln!(html, "</ol>");
}

fn write_top_threat(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='rankings'>");
    let _ = writeln!(html, "<h2>What We Saw Most</h2>");
    if let Some(family) = agg.top_families.first() {
        let _ = writeln!(
            html,
            "<p>The most reported threat this period was the <strong>{}</strong> malware family.</p>",
            escape_html(&family.label)
        );
    } else if let Some(sender) = agg.top_senders.first() {
        let _ = writeln!(
            html,
            "<p>The most reported threat this period was phishing mail from <strong>{}</strong>.</p>",
            escape_html(&sender.label)
        );
    } else {
        let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
    }
    let _ = writeln!(html, "</section>");
}

fn write_actor_alerts(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='actor-alerts'>");
    let _ = writeln!(html, "<h2>Threat Actor Activity</h2>");
    if agg.top_actor_groups.is_empty() {
        let _ = writeln!(html, "<p class='placeholder'>{NO_DATA}</p>");
    } else {
        for group in &agg.top_actor_groups {
            let _ = writeln!(
                html,
                "<div class='alert'><strong>{}</strong> was associated with {} record{} this period.</div>",
                escape_html(&group.label),
                group.count,
                if group.count == 1 { "" } else { "s" }
            );
        }
    }
    let _ = writeln!(html, "</section>");
}

fn write_awareness(html: &mut String) {
    let _ = writeln!(html, "<section id='awareness'>");
    let _ = writeln!(html, "<h2>Staying Safe</h2>");
    let _ = writeln!(html, "<ul>");
    let _ = writeln!(
        html,
        "<li>Check the sender address before acting on any email that asks for credentials or payment.</li>"
    );
    let _ = writeln!(
        html,
        "<li>Do not open attachments or links you were not expecting, even from colleagues.</li>"
    );
    let _ = writeln!(
        html,
        "<li>Report suspicious messages to the security team instead of deleting them.</li>"
    );
    let _ = writeln!(
        html,
        "<li>Use a unique password per service and enable multi-factor authentication.</li>"
    );
    let _ = writeln!(html, "</ul>");
    let _ = writeln!(html, "</section>");
}

fn write_recommendations_strategic(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='recommendations'>");
    let _ = writeln!(html, "<h2>Recommendations</h2>");
    let _ = writeln!(html, "<ul>");
    if agg.critical_high_events() > 0 {
        let _ = writeln!(
            html,
            "<li>Prioritise closure of the {} critical and high severity events before the next reporting cycle.</li>",
            agg.critical_high_events()
        );
    }
    if agg.open_events() > 0 {
        let _ = writeln!(
            html,
            "<li>Review resourcing for the response team: {} events remain open.</li>",
            agg.open_events()
        );
    }
    let _ = writeln!(
        html,
        "<li>Fund recurring phishing awareness training; phishing remains the dominant initial access vector.</li>"
    );
    let _ = writeln!(
        html,
        "<li>Reassess third-party exposure for the threat actor groups highlighted above.</li>"
    );
    let _ = writeln!(html, "</ul>");
    let _ = writeln!(html, "</section>");
}

fn write_recommendations_technical(html: &mut String, agg: &AggregationResult) {
    let _ = writeln!(html, "<section id='recommendations'>");
    let _ = writeln!(html, "<h2>Recommendations</h2>");
    let _ = writeln!(html, "<ul>");
    if let Some(family) = agg.top_families.first() {
        let _ = writeln!(
            html,
            "<li>Push updated detections for the {} family to endpoint and mail gateways.</li>",
            escape_html(&family.label)
        );
    }
    if let Some(sender) = agg.top_senders.first() {
        let _ = writeln!(
            html,
            "<li>Block or quarantine mail from {} and review lookalike domains.</li>",
            escape_html(&sender.label)
        );
    }
    let _ = writeln!(
        html,
        "<li>Verify patch baselines on externally reachable hosts touched by open events.</li>"
    );
    let _ = writeln!(
        html,
        "<li>Confirm log coverage for the event types counted in the breakdown tables.</li>"
    );
    let _ = writeln!(html, "</ul>");
    let _ = writeln!(html, "</section>");
}

/// "in_progress" -> "In Progress", "critical" -> "Critical".
fn display_label(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2rem auto;color:#222}\
h1{border-bottom:2px solid #c0392b;padding-bottom:.3rem}\
h2{margin-top:1.6rem}\
.period{color:#666}\
.metrics{list-style:none;padding:0}\
.metrics li{display:inline-block;margin-right:1.5rem}\
.metric-value{font-weight:bold;font-size:1.3rem}\
table{border-collapse:collapse;margin:.5rem 0}\
td,th{border:1px solid #ccc;padding:.25rem .6rem;text-align:left}\
caption{text-align:left;font-weight:bold;padding:.25rem 0}\
.alert{background:#fdecea;border-left:4px solid #c0392b;padding:.5rem .8rem;margin:.4rem 0}\
.placeholder{color:#888;font-style:italic}";
