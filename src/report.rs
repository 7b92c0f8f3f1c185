use std::fmt::Write;

use crate::aggregate;
use crate::filter::ActivityFilter;
use crate::models::{ActivityRecord, GlobalInsights};

fn count_of(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Dashboard highlights, most notable first.
pub fn pulse_lines(insights: &GlobalInsights) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(teacher) = &insights.most_active {
        lines.push(format!(
            "{} has the highest workload with {} and {}.",
            teacher.teacher_name,
            count_of(teacher.grades.len(), "class", "classes"),
            count_of(teacher.subjects.len(), "subject", "subjects"),
        ));
    }

    lines.push(format!(
        "{} contributing content this period.",
        count_of(insights.active_teachers, "active teacher", "active teachers")
    ));

    if let Some(teacher) = &insights.least_active {
        lines.push(format!(
            "{} has the fewest activities ({}), consider reviewing engagement.",
            teacher.teacher_name, teacher.total_activities
        ));
    }

    if let Some(top) = &insights.top_subject {
        lines.push(format!(
            "{} is the most active subject with {}.",
            top.subject,
            count_of(top.count, "activity", "activities")
        ));
    }

    lines
}

pub fn build_report(filter: &ActivityFilter, records: &[ActivityRecord]) -> String {
    let records = aggregate::dedup(records);
    let insights = aggregate::global_insights(&records);
    let teachers = aggregate::teacher_summaries(&records);
    let classes = aggregate::class_breakdown(&records, filter.teacher_id.as_deref());
    let days = aggregate::daily_activity(&records, filter.teacher_id.as_deref());

    let mut output = String::new();

    let _ = writeln!(output, "# Teacher Activity Report");
    let _ = writeln!(output, "Generated for {}", filter.describe());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Active teachers: {}", insights.active_teachers);
    let _ = writeln!(output, "- Lesson plans: {}", insights.total_lessons);
    let _ = writeln!(output, "- Quizzes: {}", insights.total_quizzes);
    let _ = writeln!(output, "- Question papers: {}", insights.total_assessments);
    let _ = writeln!(
        output,
        "- Lesson share: {}% of {} activities",
        insights.lesson_share_percent, insights.total_activities
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pulse");
    for line in pulse_lines(&insights) {
        let _ = writeln!(output, "- {line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teachers");

    if teachers.is_empty() {
        let _ = writeln!(output, "No activity recorded for this selection.");
    } else {
        let _ = writeln!(
            output,
            "| Teacher | Classes | Subjects | Lessons | Quizzes | Assessments | Total |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for teacher in teachers.iter() {
            let grades: Vec<String> = teacher.grades.iter().map(|g| g.to_string()).collect();
            let _ = writeln!(
                output,
                "| {} ({}) | {} | {} | {} | {} | {} | {} |",
                teacher.teacher_name,
                teacher.teacher_id,
                grades.join(", "),
                teacher.subjects.join(", "),
                teacher.counts.lessons,
                teacher.counts.quizzes,
                teacher.counts.assessments,
                teacher.total_activities
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Breakdown");

    if classes.is_empty() {
        let _ = writeln!(output, "No classes with activity.");
    } else {
        for class in classes.iter() {
            let _ = writeln!(
                output,
                "- {}: {} lessons, {} quizzes, {} assessments ({} total)",
                class.class_name,
                class.counts.lessons,
                class.counts.quizzes,
                class.counts.assessments,
                class.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Activity");

    if days.is_empty() {
        let _ = writeln!(output, "No activity recorded for this selection.");
    } else {
        for day in days.iter() {
            let _ = writeln!(
                output,
                "- {}: {} lessons, {} quizzes, {} assessments",
                day.date, day.counts.lessons, day.counts.quizzes, day.counts.assessments
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    let recent = aggregate::recent_activities(&records, 5);
    if recent.is_empty() {
        let _ = writeln!(output, "No activity recorded for this selection.");
    } else {
        for record in recent.iter() {
            let _ = writeln!(
                output,
                "- {} created a {} for {} {} on {}",
                record.teacher_name,
                record.activity_type,
                record.grade.class_name(),
                record.subject,
                record.created_at_display()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn demo_report_highlights_rankings() {
        let records = seed::demo_records().expect("demo records");
        let report = build_report(&ActivityFilter::default(), &records);

        assert!(report.starts_with("# Teacher Activity Report\nGenerated for all activities\n"));
        assert!(report.contains("- Active teachers: 5"));
        assert!(report.contains("- Lesson share: 41% of 44 activities"));
        assert!(report.contains("Neha Kapoor has the highest workload"));
        assert!(report.contains("Vikas Nair has the fewest activities (7)"));
        assert!(report.contains("Mathematics is the most active subject with 19 activities."));
        assert!(report.contains("- 2026-02-11: "));
    }

    #[test]
    fn empty_selection_reports_without_rankings() {
        let report = build_report(&ActivityFilter::default(), &[]);
        assert!(report.contains("- Active teachers: 0"));
        assert!(report.contains("0 active teachers contributing content this period."));
        assert!(!report.contains("highest workload"));
        assert!(report.contains("No activity recorded for this selection."));
    }

    #[test]
    fn pulse_pluralizes_counts() {
        let records = seed::demo_records().expect("demo records");
        let insights = aggregate::global_insights(&aggregate::dedup(&records));
        let lines = pulse_lines(&insights);
        // T005 teaches grades 10 and 9, Mathematics only.
        assert_eq!(
            lines.first().map(String::as_str),
            Some("Neha Kapoor has the highest workload with 2 classes and 1 subject.")
        );
        assert_eq!(lines.len(), 4);
    }
}
