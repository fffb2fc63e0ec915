use crate::admission::{ApplicationRecord, Choice};
use chrono::NaiveDate;
use serde::Serialize;

pub const NO_STUDENT_ID: &str = "No ID";

/// Everything the UI needs to render a printable admission letter. Blank
/// fields come through as empty strings, never as missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionLetter {
    pub record_id: String,
    pub date: NaiveDate,
    pub full_name: String,
    pub student_id: Option<String>,
    pub student_id_display: String,
    pub programme_name: String,
    pub faculty: String,
    pub department: String,
    pub study_level: String,
    pub intake: String,
    pub shift: String,
    pub phone: String,
    pub email: String,
    pub scholarship: String,
}

impl AdmissionLetter {
    pub fn for_record(record: &ApplicationRecord, date: NaiveDate) -> Self {
        let p = &record.programme_information;
        let person = &record.personal_information;
        let s = &record.scholarship;

        let scholarship = if s.full_scholarship {
            "Full Scholarship"
        } else if s.half_scholarship {
            "Half Scholarship"
        } else if s.has_scholarship {
            "Scholarship"
        } else {
            ""
        };

        AdmissionLetter {
            record_id: record.record_id.to_string(),
            date,
            full_name: record.full_name(),
            student_id: record.student_id.clone(),
            student_id_display: record
                .student_id
                .clone()
                .unwrap_or_else(|| NO_STUDENT_ID.to_string()),
            programme_name: p.programme_name.clone(),
            faculty: p.faculty.clone(),
            department: p.department.clone(),
            study_level: p.study_level.label().to_string(),
            intake: format!("{} {}", p.intake_month.label(), p.intake_year),
            shift: p.shift_label().to_string(),
            phone: person.phone.clone(),
            email: person.email.clone(),
            scholarship: scholarship.to_string(),
        }
    }
}
