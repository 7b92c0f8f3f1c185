use crate::error::InsightsError;
use crate::models::{parse_timestamp, ActivityRecord, Grade, Teacher};

type DemoRow = (&'static str, &'static str, u8, &'static str, &'static str, &'static str);

/// Two weeks of activity for five teachers. The last two rows replay earlier facts.
const DEMO_ACTIVITIES: &[DemoRow] = &[
    ("T004", "Vikas Nair", 10, "Social Studies", "Quiz", "2026-02-12 19:07:41"),
    ("T003", "Pooja Mehta", 7, "English", "Question Paper", "2026-02-13 15:31:51"),
    ("T004", "Vikas Nair", 10, "Social Studies", "Lesson Plan", "2026-02-11 19:15:55"),
    ("T001", "Anita Sharma", 7, "Mathematics", "Lesson Plan", "2026-02-17 20:35:33"),
    ("T004", "Vikas Nair", 9, "Social Studies", "Question Paper", "2026-02-15 16:51:32"),
    ("T003", "Pooja Mehta", 6, "English", "Quiz", "2026-02-14 15:22:29"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Quiz", "2026-02-12 12:26:22"),
    ("T002", "Rahul Verma", 9, "Science", "Quiz", "2026-02-17 09:21:32"),
    ("T002", "Rahul Verma", 9, "Science", "Question Paper", "2026-02-12 11:38:24"),
    ("T003", "Pooja Mehta", 6, "English", "Question Paper", "2026-02-17 19:07:47"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Lesson Plan", "2026-02-11 17:53:57"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Question Paper", "2026-02-16 11:26:52"),
    ("T003", "Pooja Mehta", 7, "English", "Lesson Plan", "2026-02-16 15:41:50"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Question Paper", "2026-02-11 17:54:16"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Lesson Plan", "2026-02-17 19:19:56"),
    ("T004", "Vikas Nair", 9, "Social Studies", "Quiz", "2026-02-16 19:12:33"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Question Paper", "2026-02-13 09:16:06"),
    ("T003", "Pooja Mehta", 6, "English", "Quiz", "2026-02-15 11:36:03"),
    ("T004", "Vikas Nair", 9, "Social Studies", "Lesson Plan", "2026-02-11 13:06:29"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Quiz", "2026-02-15 13:31:42"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Question Paper", "2026-02-16 11:44:31"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Lesson Plan", "2026-02-18 18:45:43"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Question Paper", "2026-02-12 19:19:44"),
    ("T002", "Rahul Verma", 8, "Science", "Quiz", "2026-02-14 13:57:07"),
    ("T002", "Rahul Verma", 8, "Science", "Question Paper", "2026-02-12 18:01:59"),
    ("T001", "Anita Sharma", 7, "Mathematics", "Question Paper", "2026-02-14 10:36:09"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Lesson Plan", "2026-02-18 16:32:47"),
    ("T004", "Vikas Nair", 10, "Social Studies", "Quiz", "2026-02-15 15:59:00"),
    ("T002", "Rahul Verma", 8, "Science", "Lesson Plan", "2026-02-15 13:31:36"),
    ("T004", "Vikas Nair", 9, "Social Studies", "Lesson Plan", "2026-02-15 16:32:23"),
    ("T003", "Pooja Mehta", 6, "English", "Question Paper", "2026-02-18 09:12:05"),
    ("T005", "Neha Kapoor", 9, "Mathematics", "Lesson Plan", "2026-02-18 16:26:04"),
    ("T005", "Neha Kapoor", 9, "Mathematics", "Lesson Plan", "2026-02-16 17:14:47"),
    ("T003", "Pooja Mehta", 6, "English", "Question Paper", "2026-02-12 17:47:58"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Quiz", "2026-02-18 14:05:20"),
    ("T002", "Rahul Verma", 8, "Science", "Quiz", "2026-02-14 09:54:01"),
    ("T002", "Rahul Verma", 9, "Science", "Lesson Plan", "2026-02-12 18:27:09"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Quiz", "2026-02-14 15:43:38"),
    ("T002", "Rahul Verma", 8, "Science", "Lesson Plan", "2026-02-18 15:48:08"),
    ("T002", "Rahul Verma", 9, "Science", "Lesson Plan", "2026-02-16 13:31:34"),
    ("T003", "Pooja Mehta", 6, "English", "Lesson Plan", "2026-02-14 19:49:54"),
    ("T005", "Neha Kapoor", 10, "Mathematics", "Quiz", "2026-02-14 11:55:18"),
    ("T003", "Pooja Mehta", 6, "English", "Lesson Plan", "2026-02-16 15:33:27"),
    ("T005", "Neha Kapoor", 9, "Mathematics", "Lesson Plan", "2026-02-18 11:51:37"),
    ("T001", "Anita Sharma", 8, "Mathematics", "Quiz", "2026-02-14 15:43:38"),
    ("T004", "Vikas Nair", 10, "Social Studies", "Quiz", "2026-02-12 19:07:41"),
];

pub fn demo_records() -> Result<Vec<ActivityRecord>, InsightsError> {
    DEMO_ACTIVITIES
        .iter()
        .map(
            |&(teacher_id, teacher_name, grade, subject, activity_type, created_at)| -> Result<ActivityRecord, InsightsError> {
                Ok(ActivityRecord {
                    teacher_id: teacher_id.to_string(),
                    teacher_name: teacher_name.to_string(),
                    grade: Grade::new(grade)?,
                    subject: subject.to_string(),
                    activity_type: activity_type.parse()?,
                    created_at: parse_timestamp(created_at)?,
                })
            },
        )
        .collect()
}

/// Distinct teachers in the demo dataset, in order of first appearance.
pub fn demo_teachers() -> Vec<Teacher> {
    let mut teachers: Vec<Teacher> = Vec::new();
    for &(teacher_id, name, ..) in DEMO_ACTIVITIES {
        if !teachers.iter().any(|t| t.teacher_id == teacher_id) {
            teachers.push(Teacher {
                teacher_id: teacher_id.to_string(),
                name: name.to_string(),
            });
        }
    }
    teachers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;

    #[test]
    fn demo_dataset_parses_and_contains_replays() {
        let records = demo_records().expect("demo rows are well formed");
        assert_eq!(records.len(), 46);
        assert_eq!(aggregate::dedup(&records).len(), 44);
        assert_eq!(demo_teachers().len(), 5);
    }
}
