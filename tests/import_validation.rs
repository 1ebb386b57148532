use std::collections::{BTreeMap, HashSet};

use gradebookd::error::ValidationError;
use gradebookd::import::{
    student_template_csv, validate, validate_students, ImportRow, ImportRules, ImportTable,
    STUDENT_REQUIRED_COLUMNS,
};

fn student_row(first: &str, admission_no: &str) -> ImportRow {
    let mut row: ImportRow = BTreeMap::new();
    for col in STUDENT_REQUIRED_COLUMNS {
        row.insert(col.to_string(), format!("{col}-value"));
    }
    row.insert("firstName".to_string(), first.to_string());
    row.insert("admissionNo".to_string(), admission_no.to_string());
    row.insert("dob".to_string(), "2010-03-15".to_string());
    row
}

fn headers() -> Vec<String> {
    STUDENT_REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[test]
fn duplicate_within_batch_rejects_only_the_second_row() {
    let table = ImportTable::from_records(
        headers(),
        &[student_row("John", "A1"), student_row("Jane", "A1")],
    );
    let report = validate(&table, &ImportRules::students(), &HashSet::new());
    assert_eq!(report.valid_rows.len(), 1);
    assert_eq!(report.valid_rows[0]["firstName"], "John");
    assert_eq!(
        report.errors,
        vec![ValidationError::DuplicateKey {
            row: 2,
            key: "admissionNo".to_string(),
            value: "A1".to_string(),
        }]
    );
    assert_eq!(report.messages(), vec!["Row 2: admissionNo A1 already exists"]);
}

#[test]
fn existing_keys_are_rejected() {
    let table = ImportTable::from_records(headers(), &[student_row("John", "ADM2024101")]);
    let existing: HashSet<String> = ["ADM2024101".to_string()].into_iter().collect();
    let report = validate(&table, &ImportRules::students(), &existing);
    assert!(report.valid_rows.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code(), "duplicate_key");
}

#[test]
fn validation_is_repeatable() {
    let text = format!(
        "{}\n\
         John,Doe,ADM2024101,9,A,j@d.e,1,Male,2010-03-15,,,,,\n\
         John,Doe,ADM2024101,9,A,j@d.e,1,Male,2010-03-15,,,,,\n\
         Bad,Row",
        student_template_csv().lines().next().unwrap_or_default()
    );
    let table = ImportTable::parse_csv(&text).expect("parse");
    let existing: HashSet<String> = ["ADM9".to_string()].into_iter().collect();

    let first = validate_students(&table, &existing);
    let second = validate_students(&table, &existing);
    assert_eq!(first, second);
    assert_eq!(first.valid_rows.len(), 1);
    assert_eq!(
        first.messages(),
        vec![
            "Row 2: admissionNo ADM2024101 already exists",
            "Row 3: Column count mismatch",
        ]
    );
}

#[test]
fn header_without_required_columns_skips_row_checks() {
    let text = "firstName,lastName\nJohn,Doe\n,\n";
    let table = ImportTable::parse_csv(text).expect("parse");
    let report = validate_students(&table, &HashSet::new());
    assert!(report.valid_rows.is_empty());
    assert_eq!(
        report.messages(),
        vec!["Missing required columns: admissionNo, class, section, email, phone, gender, dob"]
    );
}

#[test]
fn blank_required_field_is_reported() {
    let mut row = student_row("John", "A1");
    row.insert("email".to_string(), "   ".to_string());
    let table = ImportTable::from_records(headers(), &[row]);
    let report = validate(&table, &ImportRules::students(), &HashSet::new());
    assert_eq!(report.messages(), vec!["Row 1: Missing required fields"]);
    assert_eq!(
        report.errors[0],
        ValidationError::MissingRequiredField {
            row: 1,
            fields: vec!["email".to_string()],
        }
    );
}

#[test]
fn generic_rules_work_for_other_tables() {
    let rules = ImportRules::new(["employeeId", "name"], "employeeId");
    let table = ImportTable {
        headers: vec!["employeeId".to_string(), "name".to_string()],
        rows: vec![
            vec!["T1".to_string(), "Meera".to_string()],
            vec!["T2".to_string(), "Ravi".to_string()],
        ],
    };
    let report = validate(&table, &rules, &HashSet::new());
    assert!(report.is_clean());
    assert_eq!(report.valid_rows.len(), 2);
}
