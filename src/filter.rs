use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::InsightsError;
use crate::models::{ActivityRecord, Grade};

/// Unvalidated filter input, as it arrives from the command line.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub teacher_id: Option<String>,
    pub since_days: Option<i64>,
    pub as_of: Option<NaiveDateTime>,
}

/// "Last N days" ending at `reference`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub days: i64,
    pub reference: NaiveDateTime,
    since: NaiveDateTime,
}

impl TimeWindow {
    /// Fails for `days < 1` and for windows reaching past the representable range.
    pub fn last_days(days: i64, reference: NaiveDateTime) -> Result<Self, InsightsError> {
        if days < 1 {
            return Err(InsightsError::InvalidWindow(days));
        }
        let since = Duration::try_days(days)
            .and_then(|span| reference.checked_sub_signed(span))
            .ok_or(InsightsError::InvalidWindow(days))?;
        Ok(Self {
            days,
            reference,
            since,
        })
    }

    pub fn since(&self) -> NaiveDateTime {
        self.since
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.since() && at <= self.reference
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityFilter {
    pub grade: Option<Grade>,
    pub subject: Option<String>,
    pub teacher_id: Option<String>,
    pub window: Option<TimeWindow>,
}

/// Who is asking. Teachers only ever see their own activities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Teacher(String),
}

fn unless_all(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl FilterParams {
    /// `now` is used as the window reference when `as_of` is not given.
    pub fn validate(self, now: NaiveDateTime) -> Result<ActivityFilter, InsightsError> {
        let grade = unless_all(self.grade)
            .map(|raw| raw.parse::<Grade>())
            .transpose()?;
        let window = self
            .since_days
            .map(|days| TimeWindow::last_days(days, self.as_of.unwrap_or(now)))
            .transpose()?;

        Ok(ActivityFilter {
            grade,
            subject: unless_all(self.subject),
            teacher_id: self
                .teacher_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            window,
        })
    }
}

impl ActivityFilter {
    pub fn for_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    pub fn scoped_to(self, viewer: &Viewer) -> Self {
        match viewer {
            Viewer::Admin => self,
            Viewer::Teacher(id) => self.for_teacher(id.clone()),
        }
    }

    pub fn matches(&self, record: &ActivityRecord) -> bool {
        self.grade.map_or(true, |grade| record.grade == grade)
            && self
                .subject
                .as_deref()
                .map_or(true, |subject| record.subject == subject)
            && self
                .teacher_id
                .as_deref()
                .map_or(true, |id| record.teacher_id == id)
            && self
                .window
                .map_or(true, |window| window.contains(record.created_at))
    }

    pub fn apply<'a, I>(&self, records: I) -> Vec<ActivityRecord>
    where
        I: IntoIterator<Item = &'a ActivityRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(grade) = self.grade {
            parts.push(grade.class_name());
        }
        if let Some(subject) = &self.subject {
            parts.push(subject.clone());
        }
        if let Some(id) = &self.teacher_id {
            parts.push(format!("teacher {id}"));
        }
        if let Some(window) = &self.window {
            parts.push(format!("last {} days to {}", window.days, window.reference));
        }
        if parts.is_empty() {
            "all activities".to_string()
        } else {
            parts.join(", ")
        }
    }
}
