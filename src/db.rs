use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{EventRecord, MalwareRecord, PhishingRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let events = vec![
        (
            Uuid::parse_str("7a1d2c3e-5f60-4a71-8b92-a3b4c5d6e7f8")?,
            "Credential phishing wave against finance",
            Some("high"),
            Some("phishing"),
            "open",
            seed_ts(2026, 2, 2)?,
            vec!["FIN7".to_string()],
            "seed-event-001",
        ),
        (
            Uuid::parse_str("1b2c3d4e-6f70-4a81-9b92-c3d4e5f60718")?,
            "Emotet infection on workstation",
            Some("critical"),
            Some("malware"),
            "in_progress",
            seed_ts(2026, 1, 30)?,
            vec!["TA542".to_string()],
            "seed-event-002",
        ),
        (
            Uuid::parse_str("9c0d1e2f-7081-4b92-a3b4-d5e6f7081920")?,
            "Expired TLS certificate on portal",
            Some("low"),
            Some("policy_violation"),
            "resolved",
            seed_ts(2026, 1, 28)?,
            Vec::new(),
            "seed-event-003",
        ),
    ];

    for (id, title, severity, event_type, status, event_date, actor_groups, source_key) in events {
        sqlx::query(
            r#"
            INSERT INTO threat_reports.events
            (id, title, severity, event_type, status, event_date, actor_groups, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(severity)
        .bind(event_type)
        .bind(status)
        .bind(event_date)
        .bind(actor_groups)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let malware = vec![
        (
            Uuid::parse_str("2d3e4f50-8192-4ca3-b4c5-e6f708192a3b")?,
            "invoice_macro.doc",
            Some("Emotet"),
            seed_ts(2026, 1, 30)?,
            vec!["TA542".to_string()],
            "seed-malware-001",
        ),
        (
            Uuid::parse_str("3e4f5061-92a3-4db4-c5d6-f708192a3b4c")?,
            "loader.exe",
            Some("Qakbot"),
            seed_ts(2026, 2, 1)?,
            Vec::new(),
            "seed-malware-002",
        ),
    ];

    for (id, name, family, occurrence_date, actor_groups, source_key) in malware {
        sqlx::query(
            r#"
            INSERT INTO threat_reports.malware
            (id, name, family, occurrence_date, actor_groups, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(family)
        .bind(occurrence_date)
        .bind(actor_groups)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let phishing = vec![
        (
            Uuid::parse_str("4f506172-a3b4-4ec5-d6e7-08192a3b4c5d")?,
            Some("Overdue invoice #4821"),
            Some("billing@lookalike-corp.test"),
            Some("finance"),
            seed_ts(2026, 2, 2)?,
            vec!["FIN7".to_string()],
            "seed-phish-001",
        ),
        (
            Uuid::parse_str("50617283-b4c5-4fd6-e7f8-192a3b4c5d6e")?,
            Some("Password expiry notice"),
            Some("it-support@lookalike-corp.test"),
            Some("all staff"),
            seed_ts(2026, 2, 3)?,
            Vec::new(),
            "seed-phish-002",
        ),
    ];

    for (id, subject, sender, target, occurrence_date, actor_groups, source_key) in phishing {
        sqlx::query(
            r#"
            INSERT INTO threat_reports.phishing
            (id, subject, sender, target, occurrence_date, actor_groups, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(subject)
        .bind(sender)
        .bind(target)
        .bind(occurrence_date)
        .bind(actor_groups)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn seed_ts(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDateTime> {
    Ok(NaiveDate::from_ymd_opt(year, month, day)
        .context("invalid date")?
        .and_time(NaiveTime::MIN))
}

pub async fn fetch_events(
    pool: &PgPool,
    since: Option<NaiveDate>,
) -> anyhow::Result<Vec<EventRecord>> {
    let mut query = String::from(
        "SELECT id, title, description, severity, event_type, status, \
         event_date, created_at, actor_groups \
         FROM threat_reports.events",
    );
    if since.is_some() {
        query.push_str(" WHERE COALESCE(event_date, created_at) >= $1");
    }
    query.push_str(" ORDER BY created_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut events = Vec::new();
    for row in records {
        events.push(EventRecord {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            severity: row.get("severity"),
            event_type: row.get("event_type"),
            status: row.get("status"),
            event_date: row.get("event_date"),
            created_at: row.get("created_at"),
            actor_groups: row.get("actor_groups"),
        });
    }

    Ok(events)
}

pub async fn fetch_malware(
    pool: &PgPool,
    since: Option<NaiveDate>,
) -> anyhow::Result<Vec<MalwareRecord>> {
    let mut query = String::from(
        "SELECT id, name, family, description, occurrence_date, created_at, actor_groups \
         FROM threat_reports.malware",
    );
    if since.is_some() {
        query.push_str(" WHERE COALESCE(occurrence_date, created_at) >= $1");
    }
    query.push_str(" ORDER BY created_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut malware = Vec::new();
    for row in records {
        malware.push(MalwareRecord {
            id: row.get("id"),
            name: row.get("name"),
            family: row.get("family"),
            description: row.get("description"),
            occurrence_date: row.get("occurrence_date"),
            created_at: row.get("created_at"),
            actor_groups: row.get("actor_groups"),
        });
    }

    Ok(malware)
}

pub async fn fetch_phishing(
    pool: &PgPool,
    since: Option<NaiveDate>,
) -> anyhow::Result<Vec<PhishingRecord>> {
    let mut query = String::from(
        "SELECT id, subject, sender, target, description, occurrence_date, created_at, actor_groups \
         FROM threat_reports.phishing",
    );
    if since.is_some() {
        query.push_str(" WHERE COALESCE(occurrence_date, created_at) >= $1");
    }
    query.push_str(" ORDER BY created_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut phishing = Vec::new();
    for row in records {
        phishing.push(PhishingRecord {
            id: row.get("id"),
            subject: row.get("subject"),
            sender: row.get("sender"),
            target: row.get("target"),
            description: row.get("description"),
            occurrence_date: row.get("occurrence_date"),
            created_at: row.get("created_at"),
            actor_groups: row.get("actor_groups"),
        });
    }

    Ok(phishing)
}

pub async fn import_malware_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        family: Option<String>,
        description: Option<String>,
        occurrence_date: Option<NaiveDate>,
        actor_groups: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;
    let mut skipped = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let name = row.name.trim();
        if name.is_empty() {
            skipped += 1;
            continue;
        }

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO threat_reports.malware
            (id, name, family, description, occurrence_date, actor_groups, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(trimmed(row.family))
        .bind(trimmed(row.description))
        .bind(row.occurrence_date.map(|d| d.and_time(NaiveTime::MIN)))
        .bind(split_groups(row.actor_groups.as_deref()))
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            imported += 1;
        }
    }

    Ok((imported, skipped))
}

pub async fn import_phishing_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        subject: String,
        sender: Option<String>,
        target: Option<String>,
        description: Option<String>,
        occurrence_date: Option<NaiveDate>,
        actor_groups: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;
    let mut skipped = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let subject = row.subject.trim();
        if subject.is_empty() {
            skipped += 1;
            continue;
        }

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO threat_reports.phishing
            (id, subject, sender, target, description, occurrence_date, actor_groups, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subject)
        .bind(trimmed(row.sender))
        .bind(trimmed(row.target))
        .bind(trimmed(row.description))
        .bind(row.occurrence_date.map(|d| d.and_time(NaiveTime::MIN)))
        .bind(split_groups(row.actor_groups.as_deref()))
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            imported += 1;
        }
    }

    Ok((imported, skipped))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// "FIN7; TA542" -> ["FIN7", "TA542"]
fn split_groups(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Serialize)]
struct ExportData {
    export_date: String,
    events: Vec<EventRecord>,
    malware: Vec<MalwareRecord>,
    phishing: Vec<PhishingRecord>,
}

pub async fn export_json(pool: &PgPool) -> anyhow::Result<String> {
    let (events, malware, phishing) = tokio::try_join!(
        fetch_events(pool, None),
        fetch_malware(pool, None),
        fetch_phishing(pool, None),
    )?;

    let export = ExportData {
        export_date: Utc::now().to_rfc3339(),
        events,
        malware,
        phishing,
    };

    Ok(serde_json::to_string_pretty(&export)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_lists_split_on_semicolons() {
        assert_eq!(split_groups(Some("FIN7; TA542")), vec!["FIN7", "TA542"]);
        assert_eq!(split_groups(Some(" FIN7 ")), vec!["FIN7"]);
        assert!(split_groups(Some(";;")).is_empty());
        assert!(split_groups(None).is_empty());
    }

    #[test]
    fn trimmed_drops_blank_values() {
        assert_eq!(trimmed(Some("  Emotet ".to_string())), Some("Emotet".to_string()));
        assert_eq!(trimmed(Some("   ".to_string())), None);
        assert_eq!(trimmed(None), None);
    }
}
