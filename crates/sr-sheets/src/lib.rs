//! Google Sheets adapter.
//!
//! Implements the `sr-core` TabularStore over the Sheets v4 values API. The
//! first worksheet of the spreadsheet is used. An empty worksheet gets the
//! `Date | Name | Email | Phone` header on connect, and row 1 is skipped only
//! when it carries those labels.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

pub mod auth;

use auth::{fetch_token, AccessToken, ServiceAccountKey};
use sr_core::{
    config::SpreadsheetTarget,
    domain::{Record, RECORD_COLUMNS},
    errors::Error,
    store::TabularStore,
    Result,
};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const HEADER_LABELS: [&str; RECORD_COLUMNS] = ["Date", "Name", "Email", "Phone"];

/// Everything that `reconnect()` rebuilds.
struct Connection {
    key: ServiceAccountKey,
    token: AccessToken,
    spreadsheet_id: String,
    sheet_title: String,
}

pub struct GoogleSheetsStore {
    http: reqwest::Client,
    credentials_path: PathBuf,
    target: SpreadsheetTarget,
    conn: Connection,
}

impl GoogleSheetsStore {
    /// Load credentials, authorize and resolve the worksheet.
    pub async fn connect(credentials_path: PathBuf, target: SpreadsheetTarget) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        let conn = establish(&http, &credentials_path, &target).await?;
        info!(
            spreadsheet = %conn.spreadsheet_id,
            sheet = %conn.sheet_title,
            "connected to Google Sheets"
        );
        Ok(Self {
            http,
            credentials_path,
            target,
            conn,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.conn.spreadsheet_id
    }

    async fn bearer(&mut self) -> Result<String> {
        if !self.conn.token.is_fresh(Utc::now()) {
            debug!("access token expiring, renewing");
            self.conn.token = fetch_token(&self.http, &self.conn.key).await?;
        }
        Ok(self.conn.token.value.clone())
    }

    fn values_url(&self) -> Result<Url> {
        let range = a1_sheet_range(&self.conn.sheet_title);
        sheets_url(&[self.conn.spreadsheet_id.as_str(), "values", range.as_str()])
    }
}

async fn establish(
    http: &reqwest::Client,
    credentials_path: &Path,
    target: &SpreadsheetTarget,
) -> Result<Connection> {
    let key = ServiceAccountKey::from_file(credentials_path).await?;
    let token = fetch_token(http, &key).await?;
    let spreadsheet_id = match target {
        SpreadsheetTarget::Id(id) => id.clone(),
        SpreadsheetTarget::Name(name) => find_spreadsheet_by_name(http, &token, name).await?,
    };
    let sheet_title = first_sheet_title(http, &token, &spreadsheet_id).await?;
    ensure_header(http, &token, &spreadsheet_id, &sheet_title).await?;
    Ok(Connection {
        key,
        token,
        spreadsheet_id,
        sheet_title,
    })
}

fn sheets_url(segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(SHEETS_BASE).map_err(|e| Error::External(format!("bad url: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::External("sheets url cannot be a base".to_string()))?
        .extend(segments);
    Ok(url)
}

async fn get_json(http: &reqwest::Client, bearer: &str, url: Url) -> Result<Value> {
    let resp = http
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| Error::StoreUnavailable(format!("sheets request error: {e}")))?;
    read_json(resp).await
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::StoreUnavailable(format!(
            "google api error: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    resp.json()
        .await
        .map_err(|e| Error::StoreUnavailable(format!("google api json error: {e}")))
}

async fn append_row(
    http: &reqwest::Client,
    bearer: &str,
    spreadsheet_id: &str,
    sheet_title: &str,
    cells: Value,
) -> Result<()> {
    let range = format!("{}:append", a1_sheet_range(sheet_title));
    let mut url = sheets_url(&[spreadsheet_id, "values", range.as_str()])?;
    url.query_pairs_mut()
        .append_pair("valueInputOption", "USER_ENTERED")
        .append_pair("insertDataOption", "INSERT_ROWS");
    let body = json!({
        "majorDimension": "ROWS",
        "values": [cells],
    });
    let resp = http
        .post(url)
        .bearer_auth(bearer)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::StoreUnavailable(format!("sheets append error: {e}")))?;
    read_json(resp).await?;
    Ok(())
}

/// Write the header row if the worksheet's first row is empty.
async fn ensure_header(
    http: &reqwest::Client,
    token: &AccessToken,
    spreadsheet_id: &str,
    sheet_title: &str,
) -> Result<()> {
    let range = format!("{}!A1:D1", a1_sheet_range(sheet_title));
    let url = sheets_url(&[spreadsheet_id, "values", range.as_str()])?;
    let v = get_json(http, &token.value, url).await?;
    let first: ValueRange = serde_json::from_value(v)?;
    if !first_row_is_blank(&first.values) {
        return Ok(());
    }
    append_row(http, &token.value, spreadsheet_id, sheet_title, json!(HEADER_LABELS)).await?;
    info!(sheet = %sheet_title, "wrote header row to empty worksheet");
    Ok(())
}

async fn find_spreadsheet_by_name(
    http: &reqwest::Client,
    token: &AccessToken,
    name: &str,
) -> Result<String> {
    let mut url =
        Url::parse(DRIVE_FILES).map_err(|e| Error::External(format!("bad url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("q", &drive_name_query(name))
        .append_pair("fields", "files(id,name)")
        .append_pair("pageSize", "10")
        .append_pair("supportsAllDrives", "true")
        .append_pair("includeItemsFromAllDrives", "true");

    let v = get_json(http, &token.value, url).await?;
    let files: DriveFileList = serde_json::from_value(v)?;
    files
        .files
        .into_iter()
        .next()
        .map(|f| f.id)
        .ok_or_else(|| {
            Error::Config(format!(
                "spreadsheet {name:?} not found or not shared with the service account"
            ))
        })
}

async fn first_sheet_title(
    http: &reqwest::Client,
    token: &AccessToken,
    spreadsheet_id: &str,
) -> Result<String> {
    let mut url = sheets_url(&[spreadsheet_id])?;
    url.query_pairs_mut()
        .append_pair("fields", "sheets.properties(title,index)");
    let v = get_json(http, &token.value, url).await?;
    let meta: SpreadsheetMeta = serde_json::from_value(v)?;
    meta.sheets
        .into_iter()
        .min_by_key(|s| s.properties.index)
        .map(|s| s.properties.title)
        .ok_or_else(|| Error::Config(format!("spreadsheet {spreadsheet_id} has no worksheets")))
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Whole-sheet A1 range: the title in single quotes, inner quotes doubled.
fn a1_sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn first_row_is_blank(values: &[Vec<Value>]) -> bool {
    values
        .first()
        .map_or(true, |row| row.iter().all(|c| cell_text(c).trim().is_empty()))
}

/// Row 1 is a header only when its cells are the column labels.
fn is_header_row(row: &[Value]) -> bool {
    !row.is_empty()
        && row
            .iter()
            .zip(HEADER_LABELS)
            .all(|(cell, label)| cell_text(cell).trim().eq_ignore_ascii_case(label))
}

/// Convert a values response into data records, dropping a header row.
fn rows_to_records(values: &[Vec<Value>]) -> Vec<Record> {
    let skip = match values.first() {
        Some(row) if is_header_row(row) => 1,
        _ => 0,
    };
    values
        .iter()
        .skip(skip)
        .map(|row| {
            let cells: Vec<String> = row.iter().take(RECORD_COLUMNS).map(cell_text).collect();
            Record::from_cells(&cells)
        })
        .collect()
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    async fn read_all(&mut self) -> Result<Vec<Record>> {
        let bearer = self.bearer().await?;
        let mut url = self.values_url()?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        let v = get_json(&self.http, &bearer, url).await?;
        let range: ValueRange = serde_json::from_value(v)?;
        Ok(rows_to_records(&range.values))
    }

    async fn append(&mut self, record: &Record) -> Result<()> {
        let bearer = self.bearer().await?;
        append_row(
            &self.http,
            &bearer,
            &self.conn.spreadsheet_id,
            &self.conn.sheet_title,
            json!(record.to_cells()),
        )
        .await
    }

    async fn reconnect(&mut self) -> Result<()> {
        // Only swap in the new connection once it is fully established.
        self.conn = establish(&self.http, &self.credentials_path, &self.target).await?;
        debug!(spreadsheet = %self.conn.spreadsheet_id, "sheets connection re-established");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_range_quotes_titles() {
        assert_eq!(a1_sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(a1_sheet_range("Bob's leads"), "'Bob''s leads'");
    }

    #[test]
    fn drive_query_escapes_quotes() {
        let q = drive_name_query("Bob's sheet");
        assert!(q.starts_with("name = 'Bob\\'s sheet'"));
        assert!(q.contains(SPREADSHEET_MIME));
        assert!(q.ends_with("trashed = false"));
    }

    #[test]
    fn values_url_encodes_range() {
        let url = sheets_url(&["abc123", "values", "'My Sheet':append"]).unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc123/values/"));
        assert!(s.contains("My%20Sheet"));
        assert!(!s.contains(' '));
    }

    #[test]
    fn header_is_skipped_and_rows_are_normalized() {
        let v: ValueRange = serde_json::from_value(json!({
            "range": "'Sheet1'!A1:D4",
            "majorDimension": "ROWS",
            "values": [
                ["Date", "Name", "Email", "Phone"],
                ["2026-01-01 10:00:00", "Ann", "ann@example.com", "555"],
                ["2026-01-02 11:00:00", "Bo"],
                ["2026-01-03 12:00:00", "Cy", "cy@example.com", 5551234, "extra"]
            ]
        }))
        .unwrap();
        let records = rows_to_records(&v.values);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Ann");
        assert_eq!(records[1].email, "");
        assert_eq!(records[1].phone, "");
        assert_eq!(records[2].phone, "5551234");
    }

    #[test]
    fn first_row_without_labels_is_data() {
        let values = vec![
            vec![json!("2026-01-01 10:00:00"), json!("Ann"), json!("ann@example.com"), json!("555")],
            vec![json!("2026-01-02 10:00:00"), json!("Bo"), json!("bo@example.com"), json!("556")],
        ];
        let records = rows_to_records(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Ann");
    }

    #[test]
    fn header_labels_match_case_insensitively() {
        assert!(is_header_row(&[json!(" date "), json!("NAME"), json!("Email"), json!("phone")]));
        assert!(!is_header_row(&[json!("Date"), json!("Ann")]));
        assert!(!is_header_row(&[]));
    }

    #[test]
    fn blank_first_row_needs_a_header() {
        assert!(first_row_is_blank(&[]));
        assert!(first_row_is_blank(&[vec![json!(""), json!(" ")]]));
        assert!(!first_row_is_blank(&[vec![json!("Date")]]));
        assert!(!first_row_is_blank(&[vec![json!("2026-01-01 10:00:00"), json!("Ann")]]));
    }

    #[test]
    fn written_header_is_recognized_on_read() {
        let header: Vec<Value> = HEADER_LABELS.iter().map(|l| json!(l)).collect();
        let values = vec![
            header,
            vec![json!("2026-01-01 10:00:00"), json!("Ann"), json!("ann@example.com"), json!("555")],
        ];
        assert_eq!(rows_to_records(&values).len(), 1);
    }

    #[test]
    fn empty_sheet_has_no_records() {
        let v: ValueRange = serde_json::from_value(json!({ "range": "'Sheet1'!A1:Z1000" })).unwrap();
        assert!(rows_to_records(&v.values).is_empty());
        let header_only = vec![vec![json!("Date")]];
        assert!(rows_to_records(&header_only).is_empty());
    }

    #[test]
    fn first_sheet_is_lowest_index() {
        let meta: SpreadsheetMeta = serde_json::from_value(json!({
            "sheets": [
                { "properties": { "title": "Archive", "index": 1 } },
                { "properties": { "title": "Leads" } }
            ]
        }))
        .unwrap();
        let first = meta
            .sheets
            .into_iter()
            .min_by_key(|s| s.properties.index)
            .unwrap();
        assert_eq!(first.properties.title, "Leads");
    }
}
