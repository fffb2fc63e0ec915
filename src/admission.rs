use crate::student_id::canonical_faculty;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const COMPLETION_YEAR_MIN: i32 = 1950;
pub const COMPLETION_YEAR_MAX: i32 = 2099;

/// Closed option sets shared by the form, the stored records and the
/// listing filters. `label` is the exact wire string.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Choice for Gender {
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyLevel {
    Degree,
    Master,
}

impl Choice for StudyLevel {
    const ALL: &'static [Self] = &[StudyLevel::Degree, StudyLevel::Master];

    fn label(&self) -> &'static str {
        match self {
            StudyLevel::Degree => "Degree",
            StudyLevel::Master => "Master",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntakeMonth {
    September,
    #[serde(rename = "Crash Course")]
    CrashCourse,
}

impl Choice for IntakeMonth {
    const ALL: &'static [Self] = &[IntakeMonth::September, IntakeMonth::CrashCourse];

    fn label(&self) -> &'static str {
        match self {
            IntakeMonth::September => "September",
            IntakeMonth::CrashCourse => "Crash Course",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
    Weekend,
}

impl Choice for Shift {
    const ALL: &'static [Self] = &[
        Shift::Morning,
        Shift::Afternoon,
        Shift::Evening,
        Shift::Weekend,
    ];

    fn label(&self) -> &'static str {
        match self {
            Shift::Morning => "Morning",
            Shift::Afternoon => "Afternoon",
            Shift::Evening => "Evening",
            Shift::Weekend => "Weekend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl FormError {
    pub fn field(&self) -> &'static str {
        match self {
            FormError::Missing(field) => field,
            FormError::Invalid { field, .. } => field,
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        FormError::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInformation {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub nationality: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeInformation {
    pub study_level: StudyLevel,
    /// Free text so that faculties missing from the code table still round-trip.
    #[serde(default)]
    pub faculty: String,
    pub department: String,
    pub programme_name: String,
    pub intake_year: i32,
    pub intake_month: IntakeMonth,
    #[serde(default, with = "blank_shift")]
    pub shift: Option<Shift>,
}

impl ProgrammeInformation {
    pub fn shift_label(&self) -> &'static str {
        self.shift.map(|s| s.label()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scholarship {
    pub has_scholarship: bool,
    pub full_scholarship: bool,
    pub half_scholarship: bool,
}

impl Scholarship {
    /// Full and half are mutually exclusive and both require `has`.
    pub fn new(has: bool, full: bool, half: bool) -> Result<Self, FormError> {
        if full && half {
            return Err(FormError::invalid(
                "scholarship",
                "full and half scholarship cannot both be selected",
            ));
        }
        if !has && (full || half) {
            return Err(FormError::invalid(
                "scholarship",
                "scholarship type selected without hasScholarship",
            ));
        }
        Ok(Scholarship {
            has_scholarship: has,
            full_scholarship: full,
            half_scholarship: half,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationBackground {
    pub high_school_name: String,
    #[serde(deserialize_with = "year_from_number_or_text")]
    pub completion_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(default = "Uuid::new_v4")]
    pub record_id: Uuid,
    pub personal_information: PersonalInformation,
    pub programme_information: ProgrammeInformation,
    pub scholarship: Scholarship,
    pub emergency_contact: EmergencyContact,
    pub education_background: EducationBackground,
    #[serde(rename = "studentID", default)]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    /// First, middle and last name joined by single spaces, skipping blanks.
    pub fn full_name(&self) -> String {
        let p = &self.personal_information;
        [&p.first_name, &p.middle_name, &p.last_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A validated submission that has not been given a student ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDraft {
    pub personal_information: PersonalInformation,
    pub programme_information: ProgrammeInformation,
    pub scholarship: Scholarship,
    pub emergency_contact: EmergencyContact,
    pub education_background: EducationBackground,
}

impl ApplicationDraft {
    pub fn into_record(
        self,
        student_id: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> ApplicationRecord {
        ApplicationRecord {
            record_id: Uuid::new_v4(),
            personal_information: self.personal_information,
            programme_information: self.programme_information,
            scholarship: self.scholarship,
            emergency_contact: self.emergency_contact,
            education_background: self.education_background,
            student_id,
            submitted_at: Some(submitted_at),
        }
    }
}

// Raw form input as the UI sends it. Everything is optional here; `validate`
// decides what is required.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationForm {
    pub personal_information: PersonalForm,
    pub programme_information: ProgrammeForm,
    pub scholarship: ScholarshipForm,
    pub emergency_contact: EmergencyForm,
    pub education_background: EducationForm,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalForm {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub nationality: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgrammeForm {
    pub study_level: String,
    pub faculty: String,
    pub department: String,
    pub programme_name: String,
    pub intake_year: Option<i32>,
    pub intake_month: String,
    pub shift: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScholarshipForm {
    pub has_scholarship: bool,
    pub full_scholarship: bool,
    pub half_scholarship: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyForm {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationForm {
    pub high_school_name: String,
    pub completion_year: Option<YearInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearInput {
    Number(i64),
    Text(String),
}

impl YearInput {
    fn value(&self) -> Option<i64> {
        match self {
            YearInput::Number(n) => Some(*n),
            YearInput::Text(s) => s.trim().parse().ok(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, YearInput::Text(s) if s.trim().is_empty())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(FormError::Missing(field));
    }
    Ok(v.to_string())
}

fn required_choice<C: Choice>(field: &'static str, value: &str) -> Result<C, FormError> {
    let v = required(field, value)?;
    C::from_label(&v).ok_or_else(|| FormError::invalid(field, format!("unknown value {v:?}")))
}

impl ApplicationForm {
    /// Checks required fields and closed option sets. The intake year falls
    /// back to `default_intake_year` when the form leaves it out. Faculty and
    /// shift may be blank; such records get no student ID.
    pub fn validate(self, default_intake_year: i32) -> Result<ApplicationDraft, FormError> {
        let p = self.personal_information;
        let date_of_birth_raw = required("personalInformation.dateOfBirth", &p.date_of_birth)?;
        let personal_information = PersonalInformation {
            first_name: required("personalInformation.firstName", &p.first_name)?,
            middle_name: p.middle_name.trim().to_string(),
            last_name: required("personalInformation.lastName", &p.last_name)?,
            date_of_birth: NaiveDate::parse_from_str(&date_of_birth_raw, "%Y-%m-%d").map_err(
                |_| {
                    FormError::invalid(
                        "personalInformation.dateOfBirth",
                        "expected YYYY-MM-DD",
                    )
                },
            )?,
            gender: required_choice("personalInformation.gender", &p.gender)?,
            nationality: required("personalInformation.nationality", &p.nationality)?,
            phone: required("personalInformation.phone", &p.phone)?,
            email: required("personalInformation.email", &p.email)?,
        };

        let g = self.programme_information;
        let shift = if g.shift.trim().is_empty() {
            None
        } else {
            Some(required_choice::<Shift>("programmeInformation.shift", &g.shift)?)
        };
        let programme_information = ProgrammeInformation {
            study_level: required_choice("programmeInformation.studyLevel", &g.study_level)?,
            faculty: canonical_faculty(&g.faculty)
                .map(str::to_string)
                .unwrap_or_else(|| g.faculty.trim().to_string()),
            department: required("programmeInformation.department", &g.department)?,
            programme_name: required("programmeInformation.programmeName", &g.programme_name)?,
            intake_year: g.intake_year.unwrap_or(default_intake_year),
            intake_month: required_choice("programmeInformation.intakeMonth", &g.intake_month)?,
            shift,
        };

        let s = self.scholarship;
        let scholarship = Scholarship::new(s.has_scholarship, s.full_scholarship, s.half_scholarship)?;

        let e = self.emergency_contact;
        let emergency_contact = EmergencyContact {
            name: required("emergencyContact.name", &e.name)?,
            relationship: required("emergencyContact.relationship", &e.relationship)?,
            phone: required("emergencyContact.phone", &e.phone)?,
        };

        let b = self.education_background;
        let high_school_name = required("educationBackground.highSchoolName", &b.high_school_name)?;
        let completion_year = match b.completion_year {
            None => return Err(FormError::Missing("educationBackground.completionYear")),
            Some(ref y) if y.is_blank() => {
                return Err(FormError::Missing("educationBackground.completionYear"))
            }
            Some(y) => y.value().ok_or_else(|| {
                FormError::invalid("educationBackground.completionYear", "not a number")
            })?,
        };
        if !(i64::from(COMPLETION_YEAR_MIN)..=i64::from(COMPLETION_YEAR_MAX))
            .contains(&completion_year)
        {
            return Err(FormError::invalid(
                "educationBackground.completionYear",
                format!("must be between {COMPLETION_YEAR_MIN} and {COMPLETION_YEAR_MAX}"),
            ));
        }

        Ok(ApplicationDraft {
            personal_information,
            programme_information,
            scholarship,
            emergency_contact,
            education_background: EducationBackground {
                high_school_name,
                completion_year: completion_year as i32,
            },
        })
    }
}

// Older slots store completionYear as the raw input string.
fn year_from_number_or_text<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = YearInput::deserialize(deserializer)?;
    raw.value()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| serde::de::Error::custom("completionYear must be a year"))
}

mod blank_shift {
    use super::{Choice, Shift};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Shift>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(shift) => s.serialize_str(shift.label()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Shift>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(v) => Shift::from_label(v)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown shift {v:?}"))),
        }
    }
}
