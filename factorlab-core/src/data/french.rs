//! Ken French data library: the five-factor (2x3) monthly file.
//!
//! The distribution is a zip archive holding one CSV with this layout:
//!
//! ```text
//! This file was created by ...            <- preamble (3 lines)
//! The 1-month TBill return is from ...
//!
//! ,Mkt-RF,SMB,HML,RMW,CMA,RF               <- header
//! 196307,  -0.39,  -0.41,  -0.97,   0.68,  -1.18,   0.27
//! ...
//!  Annual Factors: January-December        <- marker
//! ,Mkt-RF,SMB,HML,RMW,CMA,RF
//! 1964,...
//! ```
//!
//! Only the monthly block above the marker is kept. A file with no marker
//! is rejected rather than parsed whole, since the annual rows would
//! otherwise be read as malformed months.

use super::provider::{DataError, FactorSource};
use crate::domain::{FactorRow, FactorTable, Month, FACTOR_NAMES, RISK_FREE_NAME};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::time::Duration;

/// Default location of the monthly five-factor file.
pub const FF5_URL: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/F-F_Research_Data_5_Factors_2x3_CSV.zip";

/// First-column text that opens the annual section.
pub const ANNUAL_MARKER: &str = "Annual Factors: January-December";

/// Human-readable lines before the header row.
pub const PREAMBLE_LINES: usize = 3;

/// Factor source backed by the Ken French data library over HTTP.
pub struct FrenchLibrary {
    client: reqwest::blocking::Client,
    url: String,
}

impl FrenchLibrary {
    pub fn new(url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl FactorSource for FrenchLibrary {
    fn name(&self) -> &str {
        "ken_french_library"
    }

    fn fetch_factor_csv(&self) -> Result<String, DataError> {
        tracing::info!(url = %self.url, "fetching Fama-French five-factor file");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Network(format!("HTTP {status} for {}", self.url)));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| DataError::Network(format!("reading body: {e}")))?;
        tracing::debug!(bytes = bytes.len(), "downloaded factor archive");

        extract_csv(&bytes)
    }
}

/// Extract the first CSV member of a zip archive as text.
///
/// The library ships Latin-1 text in places, so invalid UTF-8 is replaced
/// rather than rejected.
pub fn extract_csv(archive_bytes: &[u8]) -> Result<String, DataError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| DataError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .map_err(|e| DataError::Archive(e.to_string()))?;
        if !member.is_file() || !member.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }

        let mut raw = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut raw)?;
        tracing::debug!(member = member.name(), bytes = raw.len(), "extracted factor CSV");
        return Ok(String::from_utf8_lossy(&raw).into_owned());
    }

    Err(DataError::Archive("archive contains no CSV member".into()))
}

/// Parse the monthly block of a five-factor CSV.
///
/// - skips the preamble and any blank lines before the header
/// - requires every factor column plus `RF` in the header
/// - keeps data rows strictly before the first row mentioning [`ANNUAL_MARKER`]
/// - rejects a date label that is not `YYYYMM`
/// - coerces unparseable numeric cells to `None`
pub fn parse_factor_table(text: &str) -> Result<FactorTable, DataError> {
    let body: Vec<&str> = text.lines().skip(PREAMBLE_LINES).collect();
    let body = body.join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut records = reader
        .records()
        .filter(|r| r.as_ref().map_or(true, |rec| !is_blank(rec)));

    let header = records
        .next()
        .ok_or_else(|| DataError::MalformedInput("factor file has no header row".into()))?
        .map_err(|e| DataError::MalformedInput(format!("header row: {e}")))?;

    let factor_idx = FACTOR_NAMES
        .iter()
        .map(|name| column_index(&header, name))
        .collect::<Result<Vec<_>, _>>()?;
    let rf_idx = column_index(&header, RISK_FREE_NAME)?;

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut found_marker = false;

    for (line, record) in records.enumerate() {
        let record =
            record.map_err(|e| DataError::MalformedInput(format!("data row {line}: {e}")))?;
        let label = record.get(0).unwrap_or("");

        if label.contains(ANNUAL_MARKER) {
            found_marker = true;
            break;
        }

        let month = Month::parse_yyyymm(label).ok_or_else(|| {
            DataError::MalformedInput(format!("data row {line}: date '{label}' is not YYYYMM"))
        })?;
        if !seen.insert(month) {
            return Err(DataError::MalformedInput(format!(
                "data row {line}: duplicate month {month}"
            )));
        }

        let mut factors = [None; 5];
        for (slot, &idx) in factors.iter_mut().zip(factor_idx.iter()) {
            *slot = numeric_cell(&record, idx);
        }

        rows.push(FactorRow {
            month,
            factors,
            rf: numeric_cell(&record, rf_idx),
        });
    }

    if !found_marker {
        return Err(DataError::MalformedInput(format!(
            "marker '{ANNUAL_MARKER}' not found; refusing to parse the whole file"
        )));
    }

    tracing::info!(rows = rows.len(), "parsed monthly factor rows");
    Ok(FactorTable { rows })
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.is_empty())
}

fn column_index(header: &csv::StringRecord, name: &str) -> Result<usize, DataError> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DataError::MalformedInput(format!("header is missing column '{name}'")))
}

fn numeric_cell(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PREAMBLE: &str = "This file was created using the 202412 CRSP database.\r\n\
                            The 1-month TBill return is from Ibbotson and Associates Inc.\r\n\
                            \r\n";

    fn file_with(rows: &str, annual: bool) -> String {
        let mut s = String::from(PREAMBLE);
        s.push_str(",Mkt-RF,SMB,HML,RMW,CMA,RF\r\n");
        s.push_str(rows);
        if annual {
            s.push_str("\r\n Annual Factors: January-December \r\n");
            s.push_str(",Mkt-RF,SMB,HML,RMW,CMA,RF\r\n");
            s.push_str("  2023,  21.69,  -3.82,  -5.92,   1.63, -13.35,   5.01\r\n");
        }
        s
    }

    const ROWS: &str = "202301,   6.64,   4.79,  -4.01,  -2.62,  -4.54,   0.35\r\n\
                        202302,  -2.59,   1.23,  -0.78,   0.91,  -1.41,   0.34\r\n\
                        202303,   2.51,  -6.94,  -8.85,   2.24,  -2.37,   0.36\r\n";

    #[test]
    fn parses_monthly_block_only() {
        let table = parse_factor_table(&file_with(ROWS, true)).unwrap();
        assert_eq!(table.len(), 3);
        let first = &table.rows[0];
        assert_eq!(first.month, Month::new(2023, 1).unwrap());
        assert_eq!(first.factors[0], Some(6.64));
        assert_eq!(first.factors[4], Some(-4.54));
        assert_eq!(first.rf, Some(0.35));
        assert_eq!(table.rows[2].month, Month::new(2023, 3).unwrap());
    }

    #[test]
    fn missing_marker_is_malformed() {
        let err = parse_factor_table(&file_with(ROWS, false)).unwrap_err();
        assert!(matches!(err, DataError::MalformedInput(ref m) if m.contains("marker")));
    }

    #[test]
    fn bad_date_is_malformed() {
        let rows = "2023-1,   6.64,   4.79,  -4.01,  -2.62,  -4.54,   0.35\r\n";
        let err = parse_factor_table(&file_with(rows, true)).unwrap_err();
        assert!(matches!(err, DataError::MalformedInput(ref m) if m.contains("YYYYMM")));
    }

    #[test]
    fn unparseable_cell_becomes_missing() {
        let rows = "202301,   6.64,   n/a,  -4.01,  -2.62,  -4.54,   0.35\r\n";
        let table = parse_factor_table(&file_with(rows, true)).unwrap();
        assert_eq!(table.rows[0].factors[1], None);
        assert_eq!(table.rows[0].factors[0], Some(6.64));
    }

    #[test]
    fn missing_column_is_malformed() {
        let text = format!("{PREAMBLE},Mkt-RF,SMB,HML,RMW,RF\r\n Annual Factors: January-December\r\n");
        let err = parse_factor_table(&text).unwrap_err();
        assert!(matches!(err, DataError::MalformedInput(ref m) if m.contains("CMA")));
    }

    #[test]
    fn columns_are_located_by_name() {
        let text = format!(
            "{PREAMBLE},RF,CMA,RMW,HML,SMB,Mkt-RF\r\n\
             202301,0.35,-4.54,-2.62,-4.01,4.79,6.64\r\n\
             Annual Factors: January-December\r\n"
        );
        let table = parse_factor_table(&text).unwrap();
        assert_eq!(table.rows[0].factors[0], Some(6.64));
        assert_eq!(table.rows[0].rf, Some(0.35));
    }

    #[test]
    fn duplicate_month_is_malformed() {
        let rows = "202301,1,1,1,1,1,0.3\r\n202301,2,2,2,2,2,0.3\r\n";
        assert!(parse_factor_table(&file_with(rows, true)).is_err());
    }

    #[test]
    fn extract_csv_reads_zip_member() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("readme.txt", options).unwrap();
            writer.write_all(b"not this one").unwrap();
            writer.start_file("F-F_Research_Data_5_Factors_2x3.CSV", options).unwrap();
            writer.write_all(file_with(ROWS, true).as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = extract_csv(buf.get_ref()).unwrap();
        assert_eq!(parse_factor_table(&text).unwrap().len(), 3);
    }

    #[test]
    fn extract_csv_rejects_non_zip() {
        assert!(matches!(
            extract_csv(b"plain text, not an archive"),
            Err(DataError::Archive(_))
        ));
    }
}
