use std::path::PathBuf;

use serde::Deserialize;

use crate::db::SqliteSlots;
use crate::store::RecordStore;
use crate::student_id::StudentIdGenerator;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<RecordStore<SqliteSlots>>,
    pub ids: StudentIdGenerator,
    pub default_intake_year: i32,
}

impl AppState {
    pub fn new(default_intake_year: i32) -> Self {
        AppState {
            workspace: None,
            store: None,
            ids: StudentIdGenerator::new(),
            default_intake_year,
        }
    }
}
