use crate::admission::{ApplicationRecord, IntakeMonth, Shift};
use crate::db::SlotStorage;
use serde::Serialize;
use uuid::Uuid;

pub const RECORDS_SLOT: &str = "submittedStudents";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("failed to persist records: {0}")]
    Persist(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("more than one record matches {what}")]
    Ambiguous { what: String, record_ids: Vec<Uuid> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadStatus {
    Empty,
    Loaded,
    /// The slot held bytes that did not parse; the store started empty.
    Corrupt,
    /// The slot could not be read at all; the store started empty.
    Unreadable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub faculty: Option<String>,
    pub intake_month: Option<IntakeMonth>,
    pub shift: Option<Shift>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        let p = &record.programme_information;
        if let Some(f) = &self.faculty {
            if &p.faculty != f {
                return false;
            }
        }
        if let Some(m) = self.intake_month {
            if p.intake_month != m {
                return false;
            }
        }
        if let Some(s) = self.shift {
            if p.shift != Some(s) {
                return false;
            }
        }
        true
    }
}

/// Distinct non-empty values per filterable field, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub faculties: Vec<String>,
    pub intake_months: Vec<IntakeMonth>,
    pub shifts: Vec<Shift>,
}

fn push_distinct<T: PartialEq>(out: &mut Vec<T>, v: T) {
    if !out.contains(&v) {
        out.push(v);
    }
}

/// Ordered admission records mirrored into a single slot. Every mutation
/// rewrites the whole slot before the in-memory copy changes, so a failed
/// write leaves both sides as they were.
pub struct RecordStore<S: SlotStorage> {
    slots: S,
    records: Vec<ApplicationRecord>,
    load_status: LoadStatus,
}

impl<S: SlotStorage> RecordStore<S> {
    pub fn open(mut slots: S) -> Self {
        let (records, load_status) = match slots.read(RECORDS_SLOT) {
            Ok(None) => (Vec::new(), LoadStatus::Empty),
            Ok(Some(raw)) if raw.trim().is_empty() => (Vec::new(), LoadStatus::Empty),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ApplicationRecord>>(&raw) {
                Ok(records) => (records, LoadStatus::Loaded),
                Err(e) => {
                    tracing::warn!(error = %e, "stored records are corrupt; starting empty");
                    // Keep the unparsable bytes around before the next append overwrites them.
                    let backup_key = format!("{RECORDS_SLOT}.corrupt");
                    if let Err(e) = slots.write(&backup_key, &raw) {
                        tracing::warn!(error = %e, "failed to preserve corrupt records");
                    }
                    (Vec::new(), LoadStatus::Corrupt)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored records; starting empty");
                (Vec::new(), LoadStatus::Unreadable)
            }
        };

        RecordStore {
            slots,
            records,
            load_status,
        }
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    pub fn list(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, record_id: Uuid) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.record_id == record_id)
    }

    pub fn position(&self, record_id: Uuid) -> Option<usize> {
        self.records.iter().position(|r| r.record_id == record_id)
    }


    pub fn append(&mut self, record: ApplicationRecord) -> Result<(), StoreError> {
        let mut next = self.records.clone();
        next.push(record);
        self.persist(&next)?;
        self.records = next;
        Ok(())
    }

    /// Removes the record at `index` in the full collection.
    pub fn delete_at(&mut self, index: usize) -> Result<ApplicationRecord, StoreError> {
        if index >= self.records.len() {
            return Err(StoreError::NotFound(format!("index {index}")));
        }
        let mut next = self.records.clone();
        let removed = next.remove(index);
        self.persist(&next)?;
        self.records = next;
        Ok(removed)
    }

    pub fn delete(&mut self, record_id: Uuid) -> Result<ApplicationRecord, StoreError> {
        let index = self
            .position(record_id)
            .ok_or_else(|| StoreError::NotFound(format!("recordId {record_id}")))?;
        self.delete_at(index)
    }

    /// Deletes the single record holding `student_id`. Legacy data can hold
    /// the same ID more than once; then nothing is removed and the matching
    /// record ids are returned so the caller can pick one.
    pub fn delete_by_student_id(
        &mut self,
        student_id: &str,
    ) -> Result<ApplicationRecord, StoreError> {
        let matches: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.student_id.as_deref() == Some(student_id))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Err(StoreError::NotFound(format!("studentId {student_id}"))),
            [index] => self.delete_at(*index),
            _ => Err(StoreError::Ambiguous {
                what: format!("studentId {student_id}"),
                record_ids: matches.iter().map(|&i| self.records[i].record_id).collect(),
            }),
        }
    }

    pub fn filter(&self, filter: &RecordFilter) -> Vec<&ApplicationRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    pub fn filter_options(&self) -> FilterOptions {
        let mut out = FilterOptions::default();
        for r in &self.records {
            let p = &r.programme_information;
            if !p.faculty.trim().is_empty() {
                push_distinct(&mut out.faculties, p.faculty.clone());
            }
            push_distinct(&mut out.intake_months, p.intake_month);
            if let Some(s) = p.shift {
                push_distinct(&mut out.shifts, s);
            }
        }
        out
    }

    pub fn student_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|r| r.student_id.as_deref())
    }

    fn persist(&mut self, records: &[ApplicationRecord]) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(records).map_err(|e| StoreError::Persist(e.to_string()))?;
        self.slots
            .write(RECORDS_SLOT, &raw)
            .map_err(|e| StoreError::Persist(format!("{e:#}")))
    }
}
