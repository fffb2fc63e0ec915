use std::collections::HashMap;
use std::fmt;

pub const UNKNOWN_FACULTY_CODE: &str = "UNK";
const DEFAULT_SHIFT_CODE: &str = "M";

const FACULTY_CODES: [(&str, &str); 4] = [
    ("COMPUTING & INFORMATION TECHNOLOGY", "CIT"),
    ("BUSINESS & ACCOUNTING", "BA"),
    ("SOCIAL SCIENCE", "SS"),
    ("HEALTH SCIENCE", "HS"),
];

const SHIFT_CODES: [(&str, &str); 4] = [
    ("Morning", "M"),
    ("Afternoon", "A"),
    ("Evening", "E"),
    ("Weekend", "W"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoStudentId {
    #[error("faculty, intake year and shift are required to issue a student ID")]
    MissingFields,
    #[error("no student ID numbers left for {0}")]
    Exhausted(CounterKey),
}

/// Table spelling of a faculty name, matched case-insensitively after
/// trimming.
pub fn canonical_faculty(faculty: &str) -> Option<&'static str> {
    let faculty = faculty.trim();
    FACULTY_CODES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(faculty))
        .map(|(name, _)| *name)
}

/// Anything outside the faculty table gets `UNK` rather than an error.
pub fn faculty_code(faculty: &str) -> &'static str {
    let faculty = faculty.trim();
    FACULTY_CODES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(faculty))
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_FACULTY_CODE)
}

pub fn shift_code(shift: &str) -> &'static str {
    let shift = shift.trim();
    SHIFT_CODES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(shift))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_SHIFT_CODE)
}

/// Last two characters of the decimal year, not `year % 100`.
pub fn year_suffix(year: i32) -> String {
    let digits = year.to_string();
    let start = digits.len().saturating_sub(2);
    digits[start..].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub faculty_code: String,
    pub year_suffix: String,
    pub shift_code: String,
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.faculty_code, self.year_suffix, self.shift_code
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentId {
    pub key: CounterKey,
    pub sequence: u32,
}

impl StudentId {
    /// Parses `CODE/YY/S/NN`. Returns `None` for anything else, including
    /// a zero sequence.
    pub fn parse(raw: &str) -> Option<StudentId> {
        let mut parts = raw.trim().split('/');
        let faculty_code = parts.next()?;
        let year_suffix = parts.next()?;
        let shift_code = parts.next()?;
        let number = parts.next()?;
        if parts.next().is_some()
            || faculty_code.is_empty()
            || year_suffix.is_empty()
            || shift_code.is_empty()
            || number.is_empty()
            || !number.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let sequence: u32 = number.parse().ok()?;
        if sequence == 0 {
            return None;
        }
        Some(StudentId {
            key: CounterKey {
                faculty_code: faculty_code.to_string(),
                year_suffix: year_suffix.to_string(),
                shift_code: shift_code.to_string(),
            },
            sequence,
        })
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.key, self.sequence)
    }
}

/// Highest sequence number issued per (faculty, year, shift) key.
#[derive(Debug, Clone, Default)]
pub struct CounterTable {
    counters: HashMap<CounterKey, u32>,
}

impl CounterTable {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Advances the counter for `key`. Returns `None`, leaving the counter
    /// untouched, once it has reached `u32::MAX`.
    pub fn next(&mut self, key: &CounterKey) -> Option<u32> {
        let slot = self.counters.entry(key.clone()).or_insert(0);
        *slot = slot.checked_add(1)?;
        Some(*slot)
    }

    /// Raises the counter for `key` to at least `sequence`.
    pub fn observe(&mut self, key: CounterKey, sequence: u32) {
        let slot = self.counters.entry(key).or_insert(0);
        if sequence > *slot {
            *slot = sequence;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentIdGenerator {
    counters: CounterTable,
}

impl StudentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a generator that continues after the highest sequence found in
    /// `ids`. Unparsable ids are skipped.
    pub fn seeded<'a, I>(ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut g = Self::new();
        g.seed(ids);
        g
    }

    pub fn seed<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for raw in ids {
            if let Some(id) = StudentId::parse(raw) {
                self.counters.observe(id.key, id.sequence);
            }
        }
    }

    #[cfg(test)]
    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    /// Issues the next id for the triple. The counter advances immediately,
    /// so a retried call never returns the same id twice.
    pub fn generate(
        &mut self,
        faculty: &str,
        intake_year: Option<i32>,
        shift: &str,
    ) -> Result<StudentId, NoStudentId> {
        let year = match intake_year {
            Some(y) if y != 0 => y,
            _ => return Err(NoStudentId::MissingFields),
        };
        if faculty.trim().is_empty() || shift.trim().is_empty() {
            return Err(NoStudentId::MissingFields);
        }

        let key = CounterKey {
            faculty_code: faculty_code(faculty).to_string(),
            year_suffix: year_suffix(year),
            shift_code: shift_code(shift).to_string(),
        };
        match self.counters.next(&key) {
            Some(sequence) => Ok(StudentId { key, sequence }),
            None => Err(NoStudentId::Exhausted(key)),
        }
    }
}
