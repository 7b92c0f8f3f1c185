use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::models::{
    ActivityCounts, ActivityRecord, ClassBreakdown, DailyActivity, Grade, GlobalInsights,
    SubjectCount, Teacher, TeacherSummary,
};

/// Drops replayed facts, keeping the first occurrence of each composite key.
pub fn dedup(records: &[ActivityRecord]) -> Vec<ActivityRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.key()) {
            unique.push(record.clone());
        }
    }
    unique
}

fn for_teacher<'a>(
    records: &'a [ActivityRecord],
    teacher_id: Option<&'a str>,
) -> impl Iterator<Item = &'a ActivityRecord> + 'a {
    records
        .iter()
        .filter(move |record| teacher_id.map_or(true, |id| record.teacher_id == id))
}

pub fn teacher_summaries(records: &[ActivityRecord]) -> Vec<TeacherSummary> {
    let mut summaries: BTreeMap<&str, TeacherSummary> = BTreeMap::new();

    for record in records {
        summaries
            .entry(record.teacher_id.as_str())
            .or_insert_with(|| {
                TeacherSummary::empty(&Teacher {
                    teacher_id: record.teacher_id.clone(),
                    name: record.teacher_name.clone(),
                })
            })
            .record(record);
    }

    summaries.into_values().collect()
}

pub fn teacher_by_id(records: &[ActivityRecord], teacher_id: &str) -> Option<TeacherSummary> {
    teacher_summaries(records)
        .into_iter()
        .find(|summary| summary.teacher_id == teacher_id)
}

pub fn class_breakdown(records: &[ActivityRecord], teacher_id: Option<&str>) -> Vec<ClassBreakdown> {
    let mut classes: BTreeMap<Grade, ActivityCounts> = BTreeMap::new();

    for record in for_teacher(records, teacher_id) {
        classes
            .entry(record.grade)
            .or_default()
            .record(record.activity_type);
    }

    classes
        .into_iter()
        .map(|(grade, counts)| ClassBreakdown {
            grade,
            class_name: grade.class_name(),
            counts,
            total: counts.total(),
        })
        .collect()
}

pub fn daily_activity(records: &[ActivityRecord], teacher_id: Option<&str>) -> Vec<DailyActivity> {
    let mut days: BTreeMap<NaiveDate, ActivityCounts> = BTreeMap::new();

    for record in for_teacher(records, teacher_id) {
        days.entry(record.date())
            .or_default()
            .record(record.activity_type);
    }

    days.into_iter()
        .map(|(date, counts)| DailyActivity { date, counts })
        .collect()
}

fn top_subject(records: &[ActivityRecord]) -> Option<SubjectCount> {
    // Insertion-ordered so the first subject seen wins a tie.
    let mut counts: Vec<SubjectCount> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|entry| entry.subject == record.subject) {
            Some(entry) => entry.count += 1,
            None => counts.push(SubjectCount {
                subject: record.subject.clone(),
                count: 1,
            }),
        }
    }

    counts.into_iter().fold(None, |best, candidate| match best {
        Some(best) if best.count >= candidate.count => Some(best),
        _ => Some(candidate),
    })
}

fn lesson_share_percent(lessons: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        (lessons * 100 + total / 2) / total
    }
}

pub fn global_insights(records: &[ActivityRecord]) -> GlobalInsights {
    let teachers = teacher_summaries(records);

    let mut totals = ActivityCounts::default();
    for summary in &teachers {
        totals.lessons += summary.counts.lessons;
        totals.quizzes += summary.counts.quizzes;
        totals.assessments += summary.counts.assessments;
    }

    let most_active = teachers.iter().fold(None::<&TeacherSummary>, |best, t| match best {
        Some(best) if best.total_activities >= t.total_activities => Some(best),
        _ => Some(t),
    });
    let least_active = teachers.iter().fold(None::<&TeacherSummary>, |best, t| match best {
        Some(best) if best.total_activities <= t.total_activities => Some(best),
        _ => Some(t),
    });

    let all_grades: BTreeSet<Grade> = records.iter().map(|record| record.grade).collect();
    let mut all_subjects: Vec<String> = Vec::new();
    for record in records {
        if !all_subjects.contains(&record.subject) {
            all_subjects.push(record.subject.clone());
        }
    }

    GlobalInsights {
        active_teachers: teachers.len(),
        total_lessons: totals.lessons,
        total_quizzes: totals.quizzes,
        total_assessments: totals.assessments,
        total_activities: totals.total(),
        lesson_share_percent: lesson_share_percent(totals.lessons, totals.total()),
        most_active: most_active.cloned(),
        least_active: least_active.cloned(),
        top_subject: top_subject(records),
        all_grades: all_grades.into_iter().collect(),
        all_subjects,
    }
}

/// Newest first; records with equal timestamps keep their input order.
pub fn newest_first(records: &[ActivityRecord]) -> Vec<ActivityRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

pub fn activities_for_teacher(records: &[ActivityRecord], teacher_id: &str) -> Vec<ActivityRecord> {
    let own: Vec<ActivityRecord> = for_teacher(records, Some(teacher_id)).cloned().collect();
    newest_first(&own)
}

pub fn recent_activities(records: &[ActivityRecord], limit: usize) -> Vec<ActivityRecord> {
    let mut sorted = newest_first(records);
    sorted.truncate(limit);
    sorted
}
