//! CSV document writer.
//!
//! Every field is quoted, embedded quotes are doubled, and lines are joined
//! with `\n` without a trailing newline.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::format::format_value;
use crate::error::CsvError;
use crate::models::RowRecord;

/// Serialize a header set and its rows.
pub fn write_csv(headers: &[String], rows: &[RowRecord]) -> Result<String, CsvError> {
    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);

    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(
            headers
                .iter()
                .map(|h| row.get(h).map(format_value).unwrap_or_default()),
        )?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| CsvError::WriteError(e.to_string()))?;
    let mut text = String::from_utf8(data).map_err(|e| CsvError::WriteError(e.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
