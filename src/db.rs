use anyhow::Context;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::InsightsError;
use crate::filter::ActivityFilter;
use crate::models::{parse_timestamp, ActivityRecord, Grade, Teacher};
use crate::seed;
use crate::store::RecordStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_teacher(pool: &PgPool, teacher_id: &str, name: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO teacher_insights.teachers (teacher_id, full_name)
        VALUES ($1, $2)
        ON CONFLICT (teacher_id) DO UPDATE
        SET full_name = EXCLUDED.full_name
        "#,
    )
    .bind(teacher_id)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns false when the same fact is already stored.
async fn insert_activity(pool: &PgPool, record: &ActivityRecord) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO teacher_insights.activities
        (id, teacher_id, grade, subject, activity_type, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (teacher_id, grade, subject, activity_type, created_at) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.teacher_id)
    .bind(i16::from(record.grade.value()))
    .bind(&record.subject)
    .bind(record.activity_type.as_str())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    for teacher in seed::demo_teachers() {
        upsert_teacher(pool, &teacher.teacher_id, &teacher.name).await?;
    }

    let mut inserted = 0usize;
    for record in seed::demo_records()? {
        if insert_activity(pool, &record).await? {
            inserted += 1;
        }
    }

    tracing::info!(inserted, "seeded demo activities");
    Ok(inserted)
}

fn record_from_row(row: &PgRow) -> anyhow::Result<ActivityRecord> {
    let grade: i16 = row.try_get("grade")?;
    let activity_type: String = row.try_get("activity_type")?;

    Ok(ActivityRecord {
        teacher_id: row.try_get("teacher_id")?,
        teacher_name: row.try_get("full_name")?,
        grade: Grade::try_from(grade)?,
        subject: row.try_get("subject")?,
        activity_type: activity_type.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn fetch_activities(
    pool: &PgPool,
    filter: &ActivityFilter,
) -> anyhow::Result<Vec<ActivityRecord>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT t.teacher_id, t.full_name, a.grade, a.subject, a.activity_type, a.created_at \
         FROM teacher_insights.activities a \
         JOIN teacher_insights.teachers t ON t.teacher_id = a.teacher_id \
         WHERE TRUE",
    );

    if let Some(grade) = filter.grade {
        query.push(" AND a.grade = ").push_bind(i16::from(grade.value()));
    }
    if let Some(subject) = &filter.subject {
        query.push(" AND a.subject = ").push_bind(subject.clone());
    }
    if let Some(teacher_id) = &filter.teacher_id {
        query.push(" AND a.teacher_id = ").push_bind(teacher_id.clone());
    }
    if let Some(window) = filter.window {
        query
            .push(" AND a.created_at >= ")
            .push_bind(window.since())
            .push(" AND a.created_at <= ")
            .push_bind(window.reference);
    }

    let rows = query.build().fetch_all(pool).await?;
    let records = rows
        .iter()
        .map(record_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::debug!(rows = records.len(), filter = %filter.describe(), "fetched activities");
    Ok(records)
}

pub async fn find_teacher(pool: &PgPool, teacher_id: &str) -> anyhow::Result<Option<Teacher>> {
    let row = sqlx::query(
        "SELECT teacher_id, full_name FROM teacher_insights.teachers WHERE teacher_id = $1",
    )
    .bind(teacher_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> anyhow::Result<Teacher> {
        Ok(Teacher {
            teacher_id: row.try_get("teacher_id")?,
            name: row.try_get("full_name")?,
        })
    })
    .transpose()
}

/// Import row; accepts both snake_case headers and the header written by `export`.
#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(alias = "Teacher ID")]
    teacher_id: String,
    #[serde(alias = "Teacher Name")]
    teacher_name: String,
    #[serde(alias = "Grade")]
    grade: u8,
    #[serde(alias = "Subject")]
    subject: String,
    #[serde(alias = "Activity Type")]
    activity_type: String,
    #[serde(alias = "Created At")]
    created_at: String,
}

impl TryFrom<ImportRow> for ActivityRecord {
    type Error = InsightsError;

    fn try_from(row: ImportRow) -> Result<Self, Self::Error> {
        Ok(ActivityRecord {
            grade: Grade::new(row.grade)?,
            activity_type: row.activity_type.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
            teacher_id: row.teacher_id,
            teacher_name: row.teacher_name,
            subject: row.subject,
        })
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let record = ActivityRecord::try_from(result?)
            .with_context(|| format!("invalid activity on line {line}"))?;

        upsert_teacher(pool, &record.teacher_id, &record.teacher_name).await?;
        if insert_activity(pool, &record).await? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        tracing::info!(skipped, "ignored activities already on record");
    }
    Ok(inserted)
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RecordStore for PgStore {
    async fn query(&self, filter: &ActivityFilter) -> anyhow::Result<Vec<ActivityRecord>> {
        fetch_activities(&self.pool, filter).await
    }

    async fn find_teacher(&self, teacher_id: &str) -> anyhow::Result<Option<Teacher>> {
        find_teacher(&self.pool, teacher_id).await
    }
}
