// 🧾 Record Extractor
// Turns uploaded statement bytes into raw {date, amount, category} records

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::ops::Range;
use std::panic;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::{Result, StatementError};

/// Columns every structured statement must carry, verbatim
pub const REQUIRED_COLUMNS: [&str; 3] = ["Date", "Amount", "Category"];

/// Fallback label when no keyword set matches
pub const OTHER_CATEGORY: &str = "Other";

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceFormat - which branch of the extractor handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Pdf,
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceFormat::Pdf => "PDF text",
            SourceFormat::Delimited => "Delimited text",
            SourceFormat::Spreadsheet => "Spreadsheet",
        }
    }

    /// Structured formats carry named columns
    pub fn is_structured(&self) -> bool {
        !matches!(self, SourceFormat::Pdf)
    }
}

/// RawRecord - one transaction candidate before normalization
///
/// Values stay as text here; the normalizer decides what parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    pub amount: String,
    pub category: String,

    // Provenance
    pub line_number: usize,  // 1-indexed line (or row) in the source
    pub raw_line: String,    // Original text for debugging
}

impl RawRecord {
    pub fn new(date: String, amount: String, category: String) -> Self {
        RawRecord {
            date,
            amount,
            category,
            line_number: 0,
            raw_line: String::new(),
        }
    }

    /// Builder pattern: attach where the record came from
    pub fn with_provenance(mut self, line_number: usize, raw_line: String) -> Self {
        self.line_number = line_number;
        self.raw_line = raw_line;
        self
    }
}

/// ParseWarning - a PDF line whose date text matched a pattern but no format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub line_number: usize,
    pub date_text: String,
    pub line: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: could not parse date '{}' in \"{}\"",
            self.line_number, self.date_text, self.line
        )
    }
}

/// RawStatement - everything the extractor found in one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStatement {
    pub source_format: SourceFormat,
    pub source_file: String,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
    pub warnings: Vec<ParseWarning>,
}

impl RawStatement {
    pub fn new(source_format: SourceFormat, source_file: &str, columns: Vec<String>) -> Self {
        RawStatement {
            source_format,
            source_file: source_file.to_string(),
            columns,
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a statement directly from records carrying the required columns
    pub fn from_records(source_file: &str, records: Vec<RawRecord>) -> Self {
        let mut statement = RawStatement::new(
            SourceFormat::Delimited,
            source_file,
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        );
        statement.records = records;
        statement
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// StatementParser - one implementation per format branch
pub trait StatementParser: Send + Sync {
    /// Parse uploaded bytes into raw records
    ///
    /// `filename` is only used for provenance and error messages.
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<RawStatement>;

    /// The format this parser handles
    fn source_format(&self) -> SourceFormat;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Pick the parse branch from the filename extension
///
/// `.pdf` → unstructured text, `.csv` → delimited, anything else → spreadsheet.
pub fn detect_format(filename: &str) -> SourceFormat {
    let lower = filename.trim().to_lowercase();

    if lower.ends_with(".pdf") {
        SourceFormat::Pdf
    } else if lower.ends_with(".csv") {
        SourceFormat::Delimited
    } else {
        SourceFormat::Spreadsheet
    }
}

/// Get the parser for a format
pub fn get_parser(format: SourceFormat) -> Box<dyn StatementParser> {
    match format {
        SourceFormat::Pdf => Box::new(PdfParser::new()),
        SourceFormat::Delimited => Box::new(DelimitedParser::new()),
        SourceFormat::Spreadsheet => Box::new(SpreadsheetParser::new()),
    }
}

/// Detect the format and run the matching parser
pub fn extract(bytes: &[u8], filename: &str) -> Result<RawStatement> {
    let format = detect_format(filename);
    debug!(file = filename, format = format.name(), "extracting records");
    get_parser(format).parse(bytes, filename)
}

// ============================================================================
// STRUCTURED FORMATS
// ============================================================================

/// Delimited text parser (CSV)
pub struct DelimitedParser;

impl DelimitedParser {
    pub fn new() -> Self {
        DelimitedParser
    }
}

impl Default for DelimitedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser for DelimitedParser {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<RawStatement> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| StatementError::Format(format!("{}: {}", filename, e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (row_num, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                StatementError::Format(format!("{}: bad row {}: {}", filename, row_num + 2, e))
            })?;
            // +2 because: 1-indexed + header row
            rows.push((row_num + 2, record.iter().map(|c| c.to_string()).collect()));
        }

        tabular_statement(SourceFormat::Delimited, filename, header, rows)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Delimited
    }
}

/// Spreadsheet parser (xlsx, xls, xlsb, ods) - first sheet only
pub struct SpreadsheetParser;

impl SpreadsheetParser {
    pub fn new() -> Self {
        SpreadsheetParser
    }
}

impl Default for SpreadsheetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser for SpreadsheetParser {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<RawStatement> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| StatementError::Format(format!("{}: {}", filename, e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| StatementError::Format(format!("{}: workbook has no sheets", filename)))?
            .map_err(|e| StatementError::Format(format!("{}: {}", filename, e)))?;

        let mut sheet_rows = range.rows();
        let header: Vec<String> = match sheet_rows.next() {
            Some(cells) => cells.iter().map(cell_text).collect(),
            None => Vec::new(),
        };

        let rows = sheet_rows
            .enumerate()
            .map(|(i, cells)| (i + 2, cells.iter().map(cell_text).collect()))
            .collect();

        tabular_statement(SourceFormat::Spreadsheet, filename, header, rows)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Spreadsheet
    }
}

/// Render one spreadsheet cell as the text a delimited file would hold
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.date().format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/// Shared tail of both structured parsers: column check + row projection
fn tabular_statement(
    format: SourceFormat,
    filename: &str,
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
) -> Result<RawStatement> {
    if header.iter().all(|h| h.trim().is_empty()) {
        return Err(StatementError::Format(format!(
            "{}: no header row found",
            filename
        )));
    }

    let positions: Vec<Option<usize>> = REQUIRED_COLUMNS
        .iter()
        .map(|col| header.iter().position(|h| h == col))
        .collect();

    let (date_idx, amount_idx, category_idx) = match positions[..] {
        [Some(d), Some(a), Some(c)] => (d, a, c),
        _ => return Err(StatementError::missing_columns(&REQUIRED_COLUMNS, &header)),
    };

    let mut statement = RawStatement::new(format, filename, header);

    for (line_number, cells) in rows {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
        let record = RawRecord::new(cell(date_idx), cell(amount_idx), cell(category_idx))
            .with_provenance(line_number, cells.join(","));

        statement.records.push(record);
    }

    debug!(file = filename, rows = statement.len(), "structured rows read");
    Ok(statement)
}

// ============================================================================
// UNSTRUCTURED FORMAT (PDF TEXT)
// ============================================================================

/// Date pattern families, in match priority order
const DATE_PATTERNS: &[(&str, &str)] = &[
    ("MM/DD/YYYY", r"\b\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})\b"),
    ("YYYY-MM-DD", r"\b\d{4}-\d{1,2}-\d{1,2}\b"),
    (
        "Month DD, YYYY",
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b",
    ),
    (
        "DD-Mon-YYYY",
        r"(?i)\b\d{1,2}-(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*-\d{4}\b",
    ),
];

/// Formats tried on the matched date text, first success wins.
/// Two-digit years go first: `%Y` would read "24" as year 24.
const PDF_DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d-%b-%Y",
];

/// Optional sign, optional `$`, thousands separators, optional cents
const AMOUNT_PATTERN: &str = r"[-+]?(?:\$\s?)?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?";

/// Ordered category → keyword association list (first hit wins)
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Equity", &["stock", "equity", "share", "etf", "common", "preferred"]),
    (
        "Fixed Income",
        &["bond", "treasury", "note", "fixed income", "municipal", "coupon"],
    ),
    ("Cash", &["cash", "money market", "deposit", "savings", "interest", "sweep"]),
    ("Real Estate", &["real estate", "reit", "property", "mortgage"]),
    (
        "Alternative",
        &["hedge", "commodit", "gold", "crypto", "bitcoin", "private", "option", "futures"],
    ),
];

const PURCHASE_WORDS: &[&str] = &["purchase", "buy"];
const SALE_WORDS: &[&str] = &["sale", "sell"];

/// Lines before and after the current one that feed sign inference
const CONTEXT_RADIUS: usize = 2;

struct LinePatterns {
    dates: Vec<Regex>,
    amount: Regex,
}

impl LinePatterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        let dates = DATE_PATTERNS
            .iter()
            .map(|(_, pattern)| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LinePatterns {
            dates,
            amount: Regex::new(AMOUNT_PATTERN)?,
        })
    }

    /// First family (by priority, not position) that matches anywhere
    fn find_date<'t>(&self, line: &'t str) -> Option<regex::Match<'t>> {
        self.dates.iter().find_map(|re| re.find(line))
    }

    /// Amount search with the date text blanked out
    fn find_amount(&self, line: &str, date_span: Range<usize>) -> Option<String> {
        let mut masked = line.to_string();
        masked.replace_range(date_span.clone(), &" ".repeat(date_span.len()));

        self.amount.find(&masked).map(|m| m.as_str().to_string())
    }
}

static LINE_PATTERNS: OnceLock<std::result::Result<LinePatterns, regex::Error>> = OnceLock::new();

fn line_patterns() -> Result<&'static LinePatterns> {
    LINE_PATTERNS
        .get_or_init(LinePatterns::compile)
        .as_ref()
        .map_err(|e| StatementError::Extraction(format!("invalid line pattern: {}", e)))
}

/// PDF parser - text extraction followed by the line heuristic
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        PdfParser
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser for PdfParser {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<RawStatement> {
        // pdf-extract panics on some malformed documents (e.g. a page without fonts)
        let text = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| StatementError::Format(format!("{}: unreadable PDF", filename)))?
            .map_err(|e| StatementError::Format(format!("{}: {}", filename, e)))?;

        extract_from_text(&text, filename)
    }

    fn source_format(&self) -> SourceFormat {
        SourceFormat::Pdf
    }
}

/// Run the line heuristic over already-extracted statement text
///
/// Each line needs a date and an amount to become a record. Lines whose
/// date text matches a pattern but parses under no format are reported as
/// warnings and skipped. Zero records is an extraction error.
pub fn extract_from_text(text: &str, source_file: &str) -> Result<RawStatement> {
    let patterns = line_patterns()?;
    let lines: Vec<&str> = text.lines().collect();

    let mut statement = RawStatement::new(
        SourceFormat::Pdf,
        source_file,
        REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
    );

    for (idx, line) in lines.iter().enumerate() {
        let Some(date_match) = patterns.find_date(line) else {
            continue;
        };
        let Some(amount_text) = patterns.find_amount(line, date_match.range()) else {
            continue;
        };

        let Some(date) = parse_statement_date(date_match.as_str()) else {
            let warning = ParseWarning {
                line_number: idx + 1,
                date_text: date_match.as_str().to_string(),
                line: line.trim().to_string(),
            };
            warn!(file = source_file, "{}", warning);
            statement.warnings.push(warning);
            continue;
        };

        let Some(amount) = parse_amount(&amount_text) else {
            continue;
        };

        let category = categorize(line);
        let amount = apply_sign_context(amount, &context_window(&lines, idx));

        let record = RawRecord::new(
            date.format("%Y-%m-%d").to_string(),
            amount.to_string(),
            category.to_string(),
        )
        .with_provenance(idx + 1, line.trim().to_string());

        statement.records.push(record);
    }

    if statement.records.is_empty() {
        return Err(StatementError::Extraction(
            "no valid financial data found".to_string(),
        ));
    }

    debug!(
        file = source_file,
        records = statement.len(),
        warnings = statement.warnings.len(),
        "text extraction finished"
    );
    Ok(statement)
}

/// Parse matched date text against the ordered PDF format list
pub fn parse_statement_date(text: &str) -> Option<NaiveDate> {
    // "Jan.  5, 2024" → "Jan 5, 2024"
    let cleaned = text.replace('.', "").split_whitespace().collect::<Vec<_>>().join(" ");

    PDF_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Strip `$`, thousands separators and whitespace, then parse
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First category whose keyword set hits the lower-cased line
pub fn categorize(line: &str) -> &'static str {
    let lower = line.to_lowercase();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(OTHER_CATEGORY)
}

/// Current line plus up to two neighbours each side, lower-cased and joined
pub fn context_window(lines: &[&str], idx: usize) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let start = idx.saturating_sub(CONTEXT_RADIUS);
    let end = (idx + CONTEXT_RADIUS).min(lines.len() - 1);

    lines[start..=end].join(" ").to_lowercase()
}

/// Purchase wording forces a positive amount, sale wording a negative one
pub fn apply_sign_context(amount: f64, context: &str) -> f64 {
    if PURCHASE_WORDS.iter().any(|w| context.contains(w)) {
        amount.abs()
    } else if SALE_WORDS.iter().any(|w| context.contains(w)) {
        -amount.abs()
    } else {
        amount
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Format detection
    // ------------------------------------------------------------------------

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(detect_format("march.pdf"), SourceFormat::Pdf);
        assert_eq!(detect_format("March.PDF"), SourceFormat::Pdf);
        assert_eq!(detect_format("export.csv"), SourceFormat::Delimited);
        assert_eq!(detect_format("book.xlsx"), SourceFormat::Spreadsheet);
        assert_eq!(detect_format("no_extension"), SourceFormat::Spreadsheet);
    }

    #[test]
    fn test_get_parser_matches_format() {
        for format in [SourceFormat::Pdf, SourceFormat::Delimited, SourceFormat::Spreadsheet] {
            assert_eq!(get_parser(format).source_format(), format);
        }
        assert!(!SourceFormat::Pdf.is_structured());
        assert!(SourceFormat::Spreadsheet.is_structured());
    }

    // ------------------------------------------------------------------------
    // Delimited
    // ------------------------------------------------------------------------

    #[test]
    fn test_delimited_parse_projects_required_columns() {
        let csv = "Notes,Date,Category,Amount\n\
                   first,2024-01-05,Equity,\"1,200.50\"\n\
                   second,bad,Cash,10\n";

        let statement = extract(csv.as_bytes(), "jan.csv").unwrap();

        assert_eq!(statement.source_format, SourceFormat::Delimited);
        assert_eq!(statement.columns, vec!["Notes", "Date", "Category", "Amount"]);
        assert_eq!(statement.len(), 2);
        assert_eq!(statement.records[0].date, "2024-01-05");
        assert_eq!(statement.records[0].amount, "1,200.50");
        assert_eq!(statement.records[0].category, "Equity");
        assert_eq!(statement.records[0].line_number, 2);
        assert_eq!(statement.records[1].date, "bad");
    }

    #[test]
    fn test_delimited_columns_are_case_sensitive() {
        let csv = "date,Amount,category\n2024-01-05,10,Cash\n";
        let err = extract(csv.as_bytes(), "lower.csv").unwrap_err();

        match err {
            StatementError::Schema { missing, .. } => {
                assert_eq!(missing, vec!["Date", "Category"]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_delimited_empty_file_is_format_error() {
        let err = extract(b"", "empty.csv").unwrap_err();
        assert!(matches!(err, StatementError::Format(_)));
    }

    #[test]
    fn test_delimited_skips_blank_rows_and_short_rows() {
        let csv = "Date,Amount,Category\n2024-02-01,5,Cash\n,,\n2024-02-02,7\n";
        let statement = extract(csv.as_bytes(), "short.csv").unwrap();

        assert_eq!(statement.len(), 2);
        assert_eq!(statement.records[1].category, "");
    }

    // ------------------------------------------------------------------------
    // Spreadsheet
    // ------------------------------------------------------------------------

    #[test]
    fn test_spreadsheet_garbage_is_format_error() {
        let err = extract(b"definitely not a workbook", "book.xlsx").unwrap_err();
        assert!(matches!(err, StatementError::Format(_)));
    }

    #[test]
    fn test_spreadsheet_fixture_reads_first_sheet() {
        let bytes = include_bytes!("../tests/fixtures/statement.xlsx");
        let statement = extract(bytes, "statement.xlsx").unwrap();

        assert_eq!(statement.source_format, SourceFormat::Spreadsheet);
        assert_eq!(statement.columns, vec!["Date", "Amount", "Category"]);
        assert_eq!(statement.len(), 4, "blank row 5 must be skipped");

        let first = &statement.records[0];
        assert_eq!(first.date, "2024-01-05", "date cells render as ISO dates");
        assert_eq!(first.amount, "1200.5");
        assert_eq!(first.category, "Equity");
        assert_eq!(statement.records[2].date, "2024-02-01");
        assert_eq!(statement.records[3].amount, "$50.00");
    }

    #[test]
    fn test_cell_text_renders_values() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Equity".into())), "Equity");
        assert_eq!(cell_text(&Data::Float(1200.5)), "1200.5");
        assert_eq!(cell_text(&Data::Int(10)), "10");
    }

    // ------------------------------------------------------------------------
    // PDF text heuristic
    // ------------------------------------------------------------------------

    #[test]
    fn test_pdf_garbage_is_format_error() {
        let err = extract(b"not a pdf at all", "statement.pdf").unwrap_err();
        assert!(matches!(err, StatementError::Format(_)));
    }

    #[test]
    fn test_pdf_fixture_extracts_text_lines() {
        let bytes = include_bytes!("../tests/fixtures/statement.pdf");
        let statement = extract(bytes, "statement.pdf").unwrap();

        assert_eq!(statement.source_format, SourceFormat::Pdf);
        assert_eq!(statement.len(), 1);
        let record = &statement.records[0];
        assert_eq!(record.date, "2024-01-05");
        assert_eq!(record.category, "Equity");
        assert_eq!(parse_amount(&record.amount), Some(100.0));
    }

    #[test]
    fn test_pdf_without_fonts_is_format_error_not_panic() {
        let bytes = include_bytes!("../tests/fixtures/no_font.pdf");
        let err = extract(bytes, "no_font.pdf").unwrap_err();

        match err {
            StatementError::Format(msg) => assert!(msg.starts_with("no_font.pdf"), "got {msg}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_each_date_family_parses() {
        let cases = [
            ("01/05/2024 deposit 100.00", "2024-01-05"),
            ("01/05/24 deposit 100.00", "2024-01-05"),
            ("2024-01-05 deposit 100.00", "2024-01-05"),
            ("January 5, 2024 deposit 100.00", "2024-01-05"),
            ("Jan. 5, 2024 deposit 100.00", "2024-01-05"),
            ("05-Jan-2024 deposit 100.00", "2024-01-05"),
        ];

        for (line, expected) in cases {
            let statement = extract_from_text(line, "t.pdf").unwrap();
            assert_eq!(statement.records[0].date, expected, "line: {}", line);
            assert_eq!(statement.records[0].amount, "100");
        }
    }

    #[test]
    fn test_date_family_priority_beats_position() {
        // ISO date appears first, but the slash family has priority
        let line = "2024-03-01 settled 02/15/2024 cash 50.00";
        let statement = extract_from_text(line, "t.pdf").unwrap();

        assert_eq!(statement.records[0].date, "2024-02-15");
    }

    #[test]
    fn test_date_digits_are_not_the_amount() {
        let statement = extract_from_text("12/31/2024 Dividend -$855.94", "t.pdf").unwrap();
        assert_eq!(statement.records[0].amount, "-855.94");
    }

    #[test]
    fn test_amount_with_thousands_and_dollar() {
        let statement = extract_from_text("2024-01-05 Wire $12,345.67", "t.pdf").unwrap();
        assert_eq!(statement.records[0].amount, "12345.67");
    }

    #[test]
    fn test_purchase_context_forces_positive() {
        let text = "Trade confirmation\n\
                    Purchase of shares\n\
                    01/10/2024 AAPL -1,500.00\n\
                    end";
        let statement = extract_from_text(text, "t.pdf").unwrap();

        assert_eq!(statement.len(), 1);
        assert_eq!(statement.records[0].amount, "1500");
        assert!(parse_amount(&statement.records[0].amount).unwrap() >= 0.0);
    }

    #[test]
    fn test_sale_context_forces_negative() {
        let statement = extract_from_text("01/10/2024 Sale of bond 250.00", "t.pdf").unwrap();
        assert_eq!(statement.records[0].amount, "-250");
    }

    #[test]
    fn test_purchase_wins_over_sale_in_same_window() {
        let text = "Sell order\n01/10/2024 treasury 250.00\nbuy back";
        let statement = extract_from_text(text, "t.pdf").unwrap();
        assert_eq!(statement.records[0].amount, "250");
    }

    #[test]
    fn test_context_window_is_two_lines() {
        let text = "purchase\nfiller\nfiller\n01/10/2024 misc -40.00\nfiller";
        let statement = extract_from_text(text, "t.pdf").unwrap();

        // "purchase" is three lines above, outside the window
        assert_eq!(statement.records[0].amount, "-40");
    }

    #[test]
    fn test_context_window_clamps_at_edges() {
        let lines = vec!["a", "b", "c"];
        assert_eq!(context_window(&lines, 0), "a b c");
        assert_eq!(context_window(&lines, 2), "a b c");
        assert_eq!(context_window(&[], 0), "");
    }

    #[test]
    fn test_categorize_order_and_fallback() {
        assert_eq!(categorize("VANGUARD ETF dividend"), "Equity");
        assert_eq!(categorize("US Treasury Note"), "Fixed Income");
        assert_eq!(categorize("Money Market sweep"), "Cash");
        assert_eq!(categorize("REIT distribution"), "Real Estate");
        assert_eq!(categorize("Gold futures"), "Alternative");
        // Equity is checked before Alternative
        assert_eq!(categorize("Private Equity fund"), "Equity");
        assert_eq!(categorize("Wire fee"), "Other");
    }

    #[test]
    fn test_unparseable_date_is_warning_not_error() {
        let text = "13/45/2024 bogus 10.00\n\
                    Sept 5, 2024 another 20.00\n\
                    2024-02-01 good deposit 30.00";
        let statement = extract_from_text(text, "t.pdf").unwrap();

        assert_eq!(statement.len(), 1);
        assert_eq!(statement.records[0].date, "2024-02-01");
        assert_eq!(statement.warnings.len(), 2);
        assert_eq!(statement.warnings[0].line_number, 1);
        assert_eq!(statement.warnings[0].date_text, "13/45/2024");
        assert!(statement.warnings[1].to_string().contains("Sept 5, 2024"));
    }

    #[test]
    fn test_line_without_amount_is_skipped() {
        let text = "Statement date: 2024-01-31\n2024-01-05 cash 10.00";
        let statement = extract_from_text(text, "t.pdf").unwrap();

        assert_eq!(statement.len(), 1);
        assert_eq!(statement.records[0].line_number, 2);
    }

    #[test]
    fn test_no_records_is_extraction_error() {
        let text = "Account summary\nNo activity this period\nTotal 0.00";
        let err = extract_from_text(text, "t.pdf").unwrap_err();

        match err {
            StatementError::Extraction(msg) => assert_eq!(msg, "no valid financial data found"),
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_only_warnings_is_extraction_error() {
        let err = extract_from_text("99/99/2024 misc 10.00", "t.pdf").unwrap_err();
        assert!(matches!(err, StatementError::Extraction(_)));
    }

    #[test]
    fn test_parse_amount_cleanup() {
        assert_eq!(parse_amount(" $1,200.50 "), Some(1200.50));
        assert_eq!(parse_amount("-$855.94"), Some(-855.94));
        assert_eq!(parse_amount("+10"), Some(10.0));
        assert_eq!(parse_amount("ten"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
