//! # Ledger CSV Export
//!
//! Produces the spreadsheet download of the ledger and reads it back.
//!
//! ## Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ \u{FEFF}"Date","Time","Type","Category","Amount","Description",...   │
//! │ "2026-03-01","09:15:00","CASH_IN","SALES","65000","Penjualan ...",.. │
//! └──────────────────────────────────────────────────────────────────────┘
//!  • UTF-8 with a byte-order mark so spreadsheet apps pick the encoding
//!  • every field quoted, embedded quotes doubled (`"` → `""`)
//!  • CRLF line endings
//!  • Date/Time in the store's local time
//! ```

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{TransactionCategory, TransactionType};
use crate::types::LedgerTransaction;

/// UTF-8 byte-order mark.
pub const BOM: char = '\u{FEFF}';

pub const CSV_HEADER: [&str; 8] = [
    "Date",
    "Time",
    "Type",
    "Category",
    "Amount",
    "Description",
    "Notes",
    "Supplier",
];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv output is not UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("header does not match the ledger export")]
    Header,
}

// =============================================================================
// Export
// =============================================================================

/// Renders ledger rows as CSV text, dates in the `offset` local time.
pub fn export_transactions_csv(
    rows: &[LedgerTransaction],
    offset: FixedOffset,
) -> Result<String, CsvError> {
    let mut buffer = Vec::with_capacity(64 + rows.len() * 96);
    let mut bom = [0u8; 4];
    buffer.extend_from_slice(BOM.encode_utf8(&mut bom).as_bytes());

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .from_writer(buffer);
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        let local = row.created_at.with_timezone(&offset);
        let date = local.format("%Y-%m-%d").to_string();
        let time = local.format("%H:%M:%S").to_string();
        let amount = row.amount.to_string();
        writer.write_record([
            date.as_str(),
            time.as_str(),
            row.transaction_type.as_str(),
            row.category.as_str(),
            amount.as_str(),
            row.description.as_str(),
            row.notes.as_deref().unwrap_or(""),
            row.supplier_name.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

// =============================================================================
// Parse
// =============================================================================

/// A ledger row read back from CSV. Fields follow [`CSV_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CsvTransaction {
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(rename = "Type")]
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    pub amount: i64,
    pub description: String,
    pub notes: Option<String>,
    pub supplier: Option<String>,
}

/// Parses an exported ledger file. Accepts CRLF or LF records and unquoted
/// fields; the BOM is optional.
pub fn parse_transactions_csv(text: &str) -> Result<Vec<CsvTransaction>, CsvError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    if !reader.headers()?.iter().eq(CSV_HEADER) {
        return Err(CsvError::Header);
    }

    reader
        .deserialize()
        .map(|record| record.map_err(CsvError::from))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
