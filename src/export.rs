use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::models::{ActivityRecord, ActivityType, Grade};

pub const ALL_TEACHERS_FILENAME: &str = "savra_all_teachers_report.csv";

#[derive(Debug, Serialize, Deserialize)]
struct ExportRow {
    #[serde(rename = "Teacher ID")]
    teacher_id: String,
    #[serde(rename = "Teacher Name")]
    teacher_name: String,
    #[serde(rename = "Grade")]
    grade: Grade,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Activity Type")]
    activity_type: ActivityType,
    #[serde(rename = "Created At")]
    created_at: String,
}

impl From<&ActivityRecord> for ExportRow {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            teacher_id: record.teacher_id.clone(),
            teacher_name: record.teacher_name.clone(),
            grade: record.grade,
            subject: record.subject.clone(),
            activity_type: record.activity_type,
            created_at: record.created_at_display(),
        }
    }
}

/// Writes records as CSV in the order given. Only fields that need it are quoted.
pub fn to_csv(records: &[ActivityRecord]) -> Result<String, InsightsError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if records.is_empty() {
        writer.write_record([
            "Teacher ID",
            "Teacher Name",
            "Grade",
            "Subject",
            "Activity Type",
            "Created At",
        ])?;
    }
    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| InsightsError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `Anita  Sharma` becomes `Anita_Sharma_report.csv`.
pub fn export_filename(teacher_name: Option<&str>) -> String {
    let Some(name) = teacher_name else {
        return ALL_TEACHERS_FILENAME.to_string();
    };

    let mut stem = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
        } else {
            stem.push(ch);
            in_space = false;
        }
    }
    format!("{stem}_report.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;

    fn rows(csv: &str) -> Vec<ActivityRecord> {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        reader
            .deserialize::<ExportRow>()
            .map(|row| {
                let row = row.expect("row");
                ActivityRecord {
                    teacher_id: row.teacher_id,
                    teacher_name: row.teacher_name,
                    grade: row.grade,
                    subject: row.subject,
                    activity_type: row.activity_type,
                    created_at: parse_timestamp(&row.created_at).expect("timestamp"),
                }
            })
            .collect()
    }

    fn record(subject: &str, teacher_name: &str) -> ActivityRecord {
        ActivityRecord {
            teacher_id: "T001".to_string(),
            teacher_name: teacher_name.to_string(),
            grade: Grade::new(8).expect("grade"),
            subject: subject.to_string(),
            activity_type: ActivityType::QuestionPaper,
            created_at: parse_timestamp("2026-02-16 11:26:52").expect("timestamp"),
        }
    }

    #[test]
    fn header_and_plain_rows_are_unquoted() {
        let csv = to_csv(&[record("Mathematics", "Anita Sharma")]).expect("export");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Teacher ID,Teacher Name,Grade,Subject,Activity Type,Created At")
        );
        assert_eq!(
            lines.next(),
            Some("T001,Anita Sharma,8,Mathematics,Question Paper,2026-02-16 11:26:52")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_export_still_has_header() {
        let csv = to_csv(&[]).expect("export");
        assert_eq!(
            csv.trim_end(),
            "Teacher ID,Teacher Name,Grade,Subject,Activity Type,Created At"
        );
    }

    #[test]
    fn special_characters_are_escaped() {
        let csv = to_csv(&[record("Maths, Advanced", "Anita \"Ani\" Sharma")]).expect("export");
        let row = csv.lines().nth(1).expect("data row");
        assert_eq!(
            row,
            "T001,\"Anita \"\"Ani\"\" Sharma\",8,\"Maths, Advanced\",Question Paper,2026-02-16 11:26:52"
        );
    }

    #[test]
    fn standard_reader_recovers_every_field() {
        let records = vec![
            record("Maths, Advanced", "Anita Sharma"),
            record("Line\nBreak", "Rahul Verma"),
            record("Science", "Pooja \"P\" Mehta"),
        ];
        let csv = to_csv(&records).expect("export");
        assert_eq!(rows(&csv), records);
    }

    #[test]
    fn sub_second_timestamps_survive_export() {
        let whole = record("Mathematics", "Anita Sharma");
        let precise = ActivityRecord {
            created_at: parse_timestamp("2026-02-12T19:07:41.250Z").expect("timestamp"),
            ..whole.clone()
        };
        let csv = to_csv(&[precise.clone(), whole.clone()]).expect("export");

        assert!(csv.contains(",2026-02-12 19:07:41.250\n"));
        assert!(csv.contains(",2026-02-16 11:26:52\n"));
        assert_eq!(rows(&csv), vec![precise, whole]);
    }

    #[test]
    fn filenames_collapse_whitespace() {
        assert_eq!(export_filename(Some("Anita Sharma")), "Anita_Sharma_report.csv");
        assert_eq!(export_filename(Some("Anita \t Sharma")), "Anita_Sharma_report.csv");
        assert_eq!(export_filename(None), ALL_TEACHERS_FILENAME);
    }
}
