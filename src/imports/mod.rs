//! CSV imports
//!
//! Recipient lists for bulk campaigns and account credential lists. Header
//! names are matched case-insensitively, duplicate usernames keep their
//! first row, and rows that cannot be used are reported instead of failing
//! the whole file.

use serde::Serialize;
use std::collections::HashMap;

use crate::accounts::NewAccount;

/// Rows accepted from a CSV upload plus per-row problems
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvImport<T> {
    pub rows: Vec<T>,
    pub errors: Vec<String>,
}

impl<T> CsvImport<T> {
    fn rejected(error: String) -> Self {
        Self {
            rows: Vec::new(),
            errors: vec![error],
        }
    }
}

/// One campaign recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Platform username the message goes to
    pub username: String,
    /// Every column of the row, keyed by lowercased header
    pub fields: HashMap<String, String>,
}

const RECIPIENT_COLUMNS: [&str; 2] = ["username", "name"];
const ACCOUNT_COLUMNS: [&str; 2] = ["username", "password"];

/// A data row with its 1-based line number in the file
struct Row {
    line: usize,
    fields: HashMap<String, String>,
}

/// Read all rows keyed by lowercased header.
///
/// Short rows are padded with empty values.
fn read_rows(input: &str, required: &[&str]) -> Result<Vec<Row>, String> {
    if input.trim().is_empty() {
        return Err("The CSV file is empty".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Error parsing CSV file: {e}"))?
        .iter()
        .map(str::to_lowercase)
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required columns: {}", missing.join(", ")));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Error parsing CSV file: {e}"))?;
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(Row { line, fields });
    }
    Ok(rows)
}

fn field<'a>(row: &'a Row, name: &str) -> &'a str {
    row.fields.get(name).map_or("", String::as_str)
}

/// Parse a recipient list (`username` and `name` columns required)
pub fn parse_recipients(input: &str) -> CsvImport<Recipient> {
    let rows = match read_rows(input, &RECIPIENT_COLUMNS) {
        Ok(rows) => rows,
        Err(e) => return CsvImport::rejected(e),
    };

    let mut recipients: Vec<Recipient> = Vec::new();
    let mut errors = Vec::new();
    for row in rows {
        let username = field(&row, "username");
        if username.is_empty() {
            errors.push(format!("Empty username found at row {}", row.line));
            continue;
        }
        if recipients.iter().any(|r| r.username == username) {
            continue;
        }
        recipients.push(Recipient {
            username: username.to_string(),
            fields: row.fields,
        });
    }

    tracing::info!(
        recipients = recipients.len(),
        errors = errors.len(),
        "parsed recipient list"
    );
    CsvImport {
        rows: recipients,
        errors,
    }
}

/// Parse an account list (`username` and `password` columns required)
pub fn parse_accounts(input: &str) -> CsvImport<NewAccount> {
    let rows = match read_rows(input, &ACCOUNT_COLUMNS) {
        Ok(rows) => rows,
        Err(e) => return CsvImport::rejected(e),
    };

    let mut accounts: Vec<NewAccount> = Vec::new();
    let mut errors = Vec::new();
    for row in rows {
        let username = field(&row, "username");
        let password = field(&row, "password");
        if username.is_empty() {
            errors.push(format!("Empty username found at row {}", row.line));
            continue;
        }
        if password.is_empty() {
            errors.push(format!("Empty password found for username {username}"));
            continue;
        }
        if accounts.iter().any(|a| a.username == username) {
            continue;
        }
        accounts.push(NewAccount::new(username, password));
    }

    tracing::info!(accounts = accounts.len(), errors = errors.len(), "parsed account list");
    CsvImport {
        rows: accounts,
        errors,
    }
}
