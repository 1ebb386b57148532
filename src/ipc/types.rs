use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::config::Config;
use crate::gradebook::Gradebook;
use crate::import::StudentRecord;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Session state. Nothing here outlives the process.
pub struct AppState {
    pub config: Config,
    pub gradebooks: HashMap<String, Gradebook>,
    pub students: Vec<StudentRecord>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            gradebooks: HashMap::new(),
            students: Vec::new(),
        }
    }

    pub fn admission_numbers(&self) -> HashSet<String> {
        self.students.iter().map(|s| s.admission_no.clone()).collect()
    }
}
