use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::InsightsError;

/// Fractional seconds are written only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// School grade (class level), always within 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 12;

    pub fn new(value: u8) -> Result<Self, InsightsError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InsightsError::InvalidGrade(value.to_string()))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn class_name(self) -> String {
        format!("Class {}", self.0)
    }
}

impl TryFrom<u8> for Grade {
    type Error = InsightsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl TryFrom<i16> for Grade {
    type Error = InsightsError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InsightsError::InvalidGrade(value.to_string()))
            .and_then(Grade::new)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl FromStr for Grade {
    type Err = InsightsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| InsightsError::InvalidGrade(raw.to_string()))?;
        u8::try_from(value)
            .ok()
            .and_then(|v| Grade::new(v).ok())
            .ok_or_else(|| InsightsError::InvalidGrade(raw.to_string()))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "Lesson Plan")]
    LessonPlan,
    #[serde(rename = "Quiz")]
    Quiz,
    #[serde(rename = "Question Paper")]
    QuestionPaper,
}

impl ActivityType {
    pub const ALL: [ActivityType; 3] = [
        ActivityType::LessonPlan,
        ActivityType::Quiz,
        ActivityType::QuestionPaper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::LessonPlan => "Lesson Plan",
            ActivityType::Quiz => "Quiz",
            ActivityType::QuestionPaper => "Question Paper",
        }
    }
}

impl FromStr for ActivityType {
    type Err = InsightsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw.trim())
            .ok_or_else(|| InsightsError::InvalidActivityType(raw.to_string()))
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `2026-02-12 19:07:41`, `2026-02-12T19:07:41` (either with optional
/// fractional seconds) and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, InsightsError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc()))
        .map_err(|_| InsightsError::InvalidTimestamp(raw.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub teacher_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub teacher_id: String,
    pub teacher_name: String,
    pub grade: Grade,
    pub subject: String,
    pub activity_type: ActivityType,
    pub created_at: NaiveDateTime,
}

/// Composite identity of a record; two records with equal keys are the same fact.
pub type RecordKey<'a> = (&'a str, Grade, &'a str, ActivityType, NaiveDateTime);

impl ActivityRecord {
    pub fn key(&self) -> RecordKey<'_> {
        (
            self.teacher_id.as_str(),
            self.grade,
            self.subject.as_str(),
            self.activity_type,
            self.created_at,
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.created_at.date()
    }

    pub fn created_at_display(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub lessons: usize,
    pub quizzes: usize,
    pub assessments: usize,
}

impl ActivityCounts {
    pub fn record(&mut self, activity_type: ActivityType) {
        match activity_type {
            ActivityType::LessonPlan => self.lessons += 1,
            ActivityType::Quiz => self.quizzes += 1,
            ActivityType::QuestionPaper => self.assessments += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.lessons + self.quizzes + self.assessments
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherSummary {
    pub teacher_id: String,
    pub teacher_name: String,
    pub subjects: Vec<String>,
    pub grades: Vec<Grade>,
    #[serde(flatten)]
    pub counts: ActivityCounts,
    pub total_activities: usize,
    pub recent_activity: Option<ActivityRecord>,
}

impl TeacherSummary {
    pub fn empty(teacher: &Teacher) -> Self {
        Self {
            teacher_id: teacher.teacher_id.clone(),
            teacher_name: teacher.name.clone(),
            subjects: Vec::new(),
            grades: Vec::new(),
            counts: ActivityCounts::default(),
            total_activities: 0,
            recent_activity: None,
        }
    }

    pub fn record(&mut self, record: &ActivityRecord) {
        if !self.subjects.contains(&record.subject) {
            self.subjects.push(record.subject.clone());
        }
        if !self.grades.contains(&record.grade) {
            self.grades.push(record.grade);
        }
        self.counts.record(record.activity_type);
        self.total_activities += 1;

        // Strictly newer only: among equal timestamps the first one seen stays.
        let newer = self
            .recent_activity
            .as_ref()
            .map_or(true, |current| record.created_at > current.created_at);
        if newer {
            self.recent_activity = Some(record.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassBreakdown {
    pub grade: Grade,
    pub class_name: String,
    #[serde(flatten)]
    pub counts: ActivityCounts,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: ActivityCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalInsights {
    pub active_teachers: usize,
    pub total_lessons: usize,
    pub total_quizzes: usize,
    pub total_assessments: usize,
    pub total_activities: usize,
    pub lesson_share_percent: usize,
    pub most_active: Option<TeacherSummary>,
    pub least_active: Option<TeacherSummary>,
    pub top_subject: Option<SubjectCount>,
    pub all_grades: Vec<Grade>,
    pub all_subjects: Vec<String>,
}

/// Everything the per-teacher page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherDetail {
    pub teacher: TeacherSummary,
    pub class_breakdown: Vec<ClassBreakdown>,
    pub daily_activity: Vec<DailyActivity>,
    pub activities: Vec<ActivityRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_parsing_rejects_non_numeric_and_out_of_range() {
        assert_eq!("7".parse::<Grade>().map(Grade::value).ok(), Some(7));
        assert!(matches!(
            "seven".parse::<Grade>(),
            Err(InsightsError::InvalidGrade(raw)) if raw == "seven"
        ));
        assert!("0".parse::<Grade>().is_err());
        assert!("13".parse::<Grade>().is_err());
        assert!("-4".parse::<Grade>().is_err());
    }

    #[test]
    fn activity_type_names_match_dashboard_labels() {
        for kind in ActivityType::ALL {
            assert_eq!(kind.as_str().parse::<ActivityType>().ok(), Some(kind));
        }
        assert!("Homework".parse::<ActivityType>().is_err());
    }

    #[test]
    fn timestamps_accept_space_and_iso_forms() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 12)
            .and_then(|d| d.and_hms_opt(19, 7, 41))
            .expect("valid date");
        assert_eq!(parse_timestamp("2026-02-12 19:07:41").ok(), Some(expected));
        assert_eq!(parse_timestamp("2026-02-12T19:07:41").ok(), Some(expected));
        assert_eq!(parse_timestamp("2026-02-12T19:07:41.000Z").ok(), Some(expected));
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn display_keeps_fractional_seconds_only_when_present() {
        let whole = ActivityRecord {
            teacher_id: "T001".to_string(),
            teacher_name: "Anita Sharma".to_string(),
            grade: Grade::new(8).expect("grade"),
            subject: "Mathematics".to_string(),
            activity_type: ActivityType::Quiz,
            created_at: parse_timestamp("2026-02-12 19:07:41").expect("timestamp"),
        };
        assert_eq!(whole.created_at_display(), "2026-02-12 19:07:41");

        let precise = ActivityRecord {
            created_at: parse_timestamp("2026-02-12T19:07:41.250Z").expect("timestamp"),
            ..whole.clone()
        };
        assert_eq!(precise.created_at_display(), "2026-02-12 19:07:41.250");
        assert_eq!(
            parse_timestamp(&precise.created_at_display()).ok(),
            Some(precise.created_at)
        );
        assert_ne!(precise.key(), whole.key());
    }

    #[test]
    fn counts_total_is_sum_of_types() {
        let mut counts = ActivityCounts::default();
        counts.record(ActivityType::LessonPlan);
        counts.record(ActivityType::LessonPlan);
        counts.record(ActivityType::QuestionPaper);
        assert_eq!(counts.lessons, 2);
        assert_eq!(counts.assessments, 1);
        assert_eq!(counts.total(), 3);
    }
}
