//! Tabular import validation, plus the student CSV template contract.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::error::ValidationError;

pub type ImportRow = BTreeMap<String, String>;

pub const STUDENT_REQUIRED_COLUMNS: [&str; 9] = [
    "firstName",
    "lastName",
    "admissionNo",
    "class",
    "section",
    "email",
    "phone",
    "gender",
    "dob",
];

pub const STUDENT_OPTIONAL_COLUMNS: [&str; 5] = ["address", "city", "state", "zipCode", "status"];

pub const STUDENT_UNIQUE_KEY: &str = "admissionNo";
pub const STUDENT_STATUSES: [&str; 3] = ["Active", "Inactive", "Suspended"];
pub const DEFAULT_STUDENT_STATUS: &str = "Active";

const DATE_FORMAT: &str = "%Y-%m-%d";

const STUDENT_SAMPLE_ROWS: [&str; 3] = [
    "John,Doe,ADM2024101,9,A,john.doe@school.edu,+1 234-567-8901,Male,2010-03-15,123 Main St,Springfield,IL,62701,Active",
    "Jane,Smith,ADM2024102,10,B,jane.smith@school.edu,+1 234-567-8902,Female,2009-07-22,456 Oak Ave,Springfield,IL,62702,Active",
    "Michael,Brown,ADM2024103,9,A,michael.brown@school.edu,+1 234-567-8903,Male,2010-01-10,789 Pine Rd,Springfield,IL,62703,Active",
];

/// A header plus the raw cell values of each data row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ImportTable {
    /// Reads CSV text with the header on the first line. Record lengths are
    /// not enforced here so that short or long rows reach `validate`.
    pub fn parse_csv(text: &str) -> Result<Self, ValidationError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ValidationError::MalformedCsv(e.to_string()))?
            .iter()
            .map(|h| h.trim_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ValidationError::MalformedCsv(e.to_string()))?;
            // whitespace-only line; a row of empty cells still gets validated
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        if headers.iter().all(|h| h.is_empty()) || rows.is_empty() {
            return Err(ValidationError::EmptyImport);
        }
        Ok(Self { headers, rows })
    }

    /// Builds a table from rows that are already keyed by column name.
    pub fn from_records(headers: Vec<String>, records: &[ImportRow]) -> Self {
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|rec| {
                headers
                    .iter()
                    .map(|h| rec.get(h).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRules {
    pub required_columns: Vec<String>,
    pub unique_key: String,
}

impl ImportRules {
    pub fn new<I, S>(required_columns: I, unique_key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_columns: required_columns.into_iter().map(Into::into).collect(),
            unique_key: unique_key.into(),
        }
    }

    pub fn students() -> Self {
        Self::new(STUDENT_REQUIRED_COLUMNS, STUDENT_UNIQUE_KEY)
    }

    /// Required columns with the unique key appended when not already listed.
    fn columns_to_check(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self.required_columns.iter().map(String::as_str).collect();
        if !cols.contains(&self.unique_key.as_str()) {
            cols.push(self.unique_key.as_str());
        }
        cols
    }
}

fn serialize_messages<S>(errors: &[ValidationError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub valid_rows: Vec<ImportRow>,
    #[serde(serialize_with = "serialize_messages")]
    pub errors: Vec<ValidationError>,
}

impl ImportReport {
    fn rejected(error: ValidationError) -> Self {
        Self {
            valid_rows: Vec::new(),
            errors: vec![error],
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a batch without side effects. Rows are numbered from 1,
/// header excluded.
pub fn validate(
    table: &ImportTable,
    rules: &ImportRules,
    existing_keys: &HashSet<String>,
) -> ImportReport {
    validate_with(table, rules, existing_keys, |_, _| None)
}

/// `validate` with an extra per-row check that runs after the required-field
/// check and before the row claims its unique key.
pub fn validate_with<F>(
    table: &ImportTable,
    rules: &ImportRules,
    existing_keys: &HashSet<String>,
    check: F,
) -> ImportReport
where
    F: Fn(usize, &ImportRow) -> Option<ValidationError>,
{
    let required = rules.columns_to_check();
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.headers.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return ImportReport::rejected(ValidationError::MissingColumns { columns: missing });
    }

    let mut report = ImportReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (idx, values) in table.rows.iter().enumerate() {
        let row = idx + 1;
        if values.len() != table.headers.len() {
            report.errors.push(ValidationError::ColumnMismatch {
                row,
                expected: table.headers.len(),
                found: values.len(),
            });
            continue;
        }

        let record: ImportRow = table
            .headers
            .iter()
            .cloned()
            .zip(values.iter().map(|v| v.trim().to_string()))
            .collect();

        let empty: Vec<String> = required
            .iter()
            .filter(|c| record.get(**c).map(|v| v.is_empty()).unwrap_or(true))
            .map(|c| c.to_string())
            .collect();
        if !empty.is_empty() {
            report.errors.push(ValidationError::MissingRequiredField { row, fields: empty });
            continue;
        }

        if let Some(e) = check(row, &record) {
            report.errors.push(e);
            continue;
        }

        let key_value = record.get(&rules.unique_key).cloned().unwrap_or_default();
        if existing_keys.contains(&key_value) || !seen.insert(key_value.clone()) {
            report.errors.push(ValidationError::DuplicateKey {
                row,
                key: rules.unique_key.clone(),
                value: key_value,
            });
            continue;
        }

        report.valid_rows.push(record);
    }

    report
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn check_student_row(row: usize, record: &ImportRow) -> Option<ValidationError> {
    let dob = record.get("dob").map(String::as_str).unwrap_or("");
    if parse_iso_date(dob).is_none() {
        return Some(ValidationError::InvalidDate {
            row,
            column: "dob".to_string(),
            value: dob.to_string(),
        });
    }
    if let Some(status) = record.get("status").filter(|s| !s.is_empty()) {
        if !STUDENT_STATUSES.contains(&status.as_str()) {
            return Some(ValidationError::InvalidStatus {
                row,
                value: status.clone(),
            });
        }
    }
    None
}

/// Student import: the generic checks plus `dob` format and `status` values.
pub fn validate_students(table: &ImportTable, existing_keys: &HashSet<String>) -> ImportReport {
    let report = validate_with(table, &ImportRules::students(), existing_keys, check_student_row);
    tracing::debug!(
        rows = table.rows.len(),
        valid = report.valid_rows.len(),
        errors = report.errors.len(),
        "validated student import"
    );
    report
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub admission_no: String,
    pub class: String,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub status: String,
}

impl StudentRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Turns validated rows into records with generated ids and defaults filled.
pub fn into_student_records(
    valid_rows: &[ImportRow],
) -> Result<Vec<StudentRecord>, ValidationError> {
    let field = |row: &ImportRow, key: &str| row.get(key).cloned().unwrap_or_default();

    valid_rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let dob_raw = field(row, "dob");
            let Some(dob) = parse_iso_date(&dob_raw) else {
                return Err(ValidationError::InvalidDate {
                    row: idx + 1,
                    column: "dob".to_string(),
                    value: dob_raw,
                });
            };
            let status = row
                .get("status")
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_STUDENT_STATUS.to_string());
            Ok(StudentRecord {
                id: Uuid::new_v4().to_string(),
                first_name: field(row, "firstName"),
                last_name: field(row, "lastName"),
                admission_no: field(row, "admissionNo"),
                class: field(row, "class"),
                section: field(row, "section"),
                email: field(row, "email"),
                phone: field(row, "phone"),
                gender: field(row, "gender"),
                dob,
                address: field(row, "address"),
                city: field(row, "city"),
                state: field(row, "state"),
                zip_code: field(row, "zipCode"),
                status,
            })
        })
        .collect()
}

/// Header line plus three sample rows.
pub fn student_template_csv() -> String {
    let header: Vec<&str> = STUDENT_REQUIRED_COLUMNS
        .iter()
        .chain(STUDENT_OPTIONAL_COLUMNS.iter())
        .copied()
        .collect();
    let mut lines = vec![header.join(",")];
    lines.extend(STUDENT_SAMPLE_ROWS.iter().map(|r| r.to_string()));
    lines.join("\n")
}

pub fn student_import_instructions() -> String {
    [
        "CSV Import Instructions:",
        "",
        "Required Columns:",
        "- firstName: Student's first name",
        "- lastName: Student's last name",
        "- admissionNo: Unique admission number (must not already exist)",
        "- class: Grade/Class level",
        "- section: Section within the class",
        "- email: Student's email address",
        "- phone: Contact phone number",
        "- gender: Male, Female, or Other",
        "- dob: Date of birth (YYYY-MM-DD format)",
        "",
        "Optional Columns:",
        "- address: Street address",
        "- city: City name",
        "- state: State/Province",
        "- zipCode: Postal code",
        "- status: Active, Inactive, or Suspended (defaults to Active)",
        "",
        "Notes:",
        "- First row must contain column headers",
        "- All required fields must be filled",
        "- Admission numbers must be unique",
        "- Date format must be YYYY-MM-DD",
    ]
    .join("\n")
}
