//! CSV tokenizer with encoding and delimiter auto-detection.
//!
//! Turns CSV text into raw rows (header → cell text). Values are not typed
//! here; see [`crate::codec::coerce`].
//!
//! Input is split strictly by line: a quoted value holding a literal newline
//! is not supported and will break the row in two. Within a line, quoted
//! fields may contain the delimiter and escaped quotes (`""`).

use csv::{ReaderBuilder, StringRecord};

use crate::error::CsvError;
use crate::models::RawRow;

/// Delimiter written on export and assumed when sniffing finds nothing.
pub const DEFAULT_DELIMITER: char = ',';

const BOM: char = '\u{feff}';

/// Result of tokenizing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Tokenized rows
    pub rows: Vec<RawRow>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers, in file order
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, CsvError> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        // WHATWG maps the Latin-1 labels to windows-1252.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (text, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(CsvError::EncodingError(format!(
                        "invalid {} byte sequence",
                        enc.name()
                    )));
                }
                text.to_string()
            }
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    };

    Ok(text.trim_start_matches(BOM).to_string())
}

/// Detect the delimiter by counting occurrences in the first non-blank line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = DEFAULT_DELIMITER;
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Tokenize CSV text into raw rows.
///
/// The first non-blank line is the header; blank lines are skipped. Missing
/// trailing cells read as empty text and surplus cells are ignored, so one
/// malformed line never aborts the document.
///
/// # Example
/// ```ignore
/// use recordport::parser::tokenize;
///
/// let rows = tokenize("\"name\",\"age\"\n\"Alice\",\"30\"", ',').unwrap();
/// assert_eq!(rows[0]["name"], "Alice");
/// ```
pub fn tokenize(content: &str, delimiter: char) -> Result<Vec<RawRow>, CsvError> {
    parse_string_with_metadata(content, delimiter, "utf-8".to_string()).map(|r| r.rows)
}

/// Tokenize CSV text with explicit delimiter and return metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> Result<ParseResult, CsvError> {
    let content = content.trim_start_matches(BOM);
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header_line = lines.next().ok_or(CsvError::EmptyFile)?;
    let headers: Vec<String> = split_line(header_line, delimiter)
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = lines
        .map(|line| {
            let cells = split_line(line, delimiter);
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), cells.get(i).unwrap_or("").to_string()))
                .collect::<RawRow>()
        })
        .collect();

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Split one line into cells, honoring quotes and `""` escapes.
fn split_line(line: &str, delimiter: char) -> StringRecord {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter_byte(delimiter))
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record,
        // Undecodable or empty line: keep what the raw split gives.
        _ => line.split(delimiter).collect(),
    }
}

fn delimiter_byte(delimiter: char) -> u8 {
    if delimiter.is_ascii() {
        delimiter as u8
    } else {
        DEFAULT_DELIMITER as u8
    }
}

/// Tokenize CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CsvError::EmptyFile);
    }

    // Detect encoding
    let encoding = detect_encoding(bytes);

    // Decode content
    let content = decode_content(bytes, &encoding)?;

    // Detect delimiter
    let delimiter = detect_delimiter(&content);

    parse_string_with_metadata(&content, delimiter, encoding)
}
