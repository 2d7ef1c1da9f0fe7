//! In-process conversion between structured data formats.
//!
//! Every input is read into a JSON value first (CSV and spreadsheets as an
//! array of row objects, XML as nested objects with `@attr` and `#text`
//! keys, plain text as `{"lines": [...]}`) and then rendered as JSON, CSV or
//! XML. Malformed input is a soft failure so the chain can move on.

use std::path::Path;

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader as _};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{json, Map, Number, Value};
use thiserror::Error;

use crate::format::{Format, FormatFamily, FormatPair};

use super::error::StrategyError;
use super::staging::Staging;
use super::traits::Strategy;
use super::types::{ProgressReporter, StrategyOutcome, StrategyRequest};

#[derive(Debug, Error)]
enum DataError {
    #[error("input is not valid UTF-8")]
    NotUtf8,

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("unreadable spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("spreadsheet has no worksheets")]
    NoSheet,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn xml_error(e: impl std::fmt::Display) -> DataError {
    DataError::Xml(e.to_string())
}

/// Converts CSV, JSON, XML, TXT and spreadsheets into JSON, CSV or XML.
#[derive(Debug, Clone, Default)]
pub struct DataStrategy;

impl DataStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn supports(source: Format, destination: Format) -> bool {
        let readable = source.family() == FormatFamily::Spreadsheet
            || matches!(source, Format::Csv | Format::Json | Format::Xml | Format::Txt);
        let writable = matches!(destination, Format::Json | Format::Csv | Format::Xml);
        readable && writable && source != destination
    }
}

#[async_trait]
impl Strategy for DataStrategy {
    fn name(&self) -> &str {
        "data"
    }

    async fn convert(
        &self,
        request: &StrategyRequest,
        progress: &ProgressReporter,
    ) -> Result<StrategyOutcome, StrategyError> {
        let pair = request.pair;
        if !Self::supports(pair.source, pair.destination) {
            return Ok(StrategyOutcome::soft_failure(format!(
                "data conversion cannot handle {}",
                pair
            )));
        }

        let staging = Staging::create(request, self.name()).await?;
        // calamine picks the reader from the file extension.
        let input = if pair.source.family() == FormatFamily::Spreadsheet {
            staging.stage_input(request).await?
        } else {
            request.input_path.clone()
        };
        progress.report(20);

        let transformed = tokio::task::spawn_blocking(move || transform(&input, pair))
            .await
            .map_err(|e| StrategyError::Panicked(e.to_string()))?;
        let rendered = match transformed {
            Ok(rendered) => rendered,
            Err(DataError::Io(e)) => return Err(StrategyError::unreadable(e.to_string())),
            Err(e) => return Ok(StrategyOutcome::soft_failure(e.to_string())),
        };
        progress.report(80);

        let produced = staging.output_path(request);
        tokio::fs::write(&produced, rendered).await?;
        staging.publish(&produced, request).await?;
        progress.report(95);

        Ok(StrategyOutcome::success())
    }
}

fn transform(input: &Path, pair: FormatPair) -> Result<Vec<u8>, DataError> {
    let value = match pair.source {
        Format::Xlsx | Format::Xls | Format::Ods => read_spreadsheet(input)?,
        source => {
            let bytes = std::fs::read(input)?;
            let text = String::from_utf8(bytes).map_err(|_| DataError::NotUtf8)?;
            let text = text.trim_start_matches('\u{feff}');
            match source {
                Format::Csv => parse_csv(text)?,
                Format::Json => serde_json::from_str(text)?,
                Format::Xml => parse_xml(text)?,
                _ => parse_lines(text),
            }
        }
    };

    match pair.destination {
        Format::Json => Ok(serde_json::to_vec_pretty(&value)?),
        Format::Csv => write_csv(&value),
        _ if pair.source == Format::Csv || pair.source.family() == FormatFamily::Spreadsheet => {
            write_xml(&value, "data", "row")
        }
        _ => write_xml(&value, "root", "item"),
    }
}

fn column_name(index: usize, header: &str) -> String {
    let header = header.trim();
    if header.is_empty() {
        format!("column_{}", index + 1)
    } else {
        header.to_string()
    }
}

/// Numbers become JSON numbers, blanks become null.
fn infer(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::from(n);
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

fn parse_csv(text: &str) -> Result<Value, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| column_name(i, h))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), infer(record.get(i).unwrap_or(""))))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

fn parse_lines(text: &str) -> Value {
    json!({ "lines": text.lines().map(str::trim).collect::<Vec<_>>() })
}

/// First worksheet, first row as headers.
fn read_spreadsheet(path: &Path) -> Result<Value, DataError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| DataError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DataError::NoSheet)?
        .map_err(|e| DataError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Value::Array(Vec::new()));
    };
    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| column_name(i, &cell.to_string()))
        .collect();

    let records = rows
        .map(|row| {
            let fields: Map<String, Value> = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.get(i).map_or(Value::Null, cell_value)))
                .collect();
            Value::Object(fields)
        })
        .collect();
    Ok(Value::Array(records))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// An element being built while its children are read.
struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, DataError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value().map_err(xml_error)?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

/// Repeated names collapse into an array.
fn attach(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn parse_xml(text: &str) -> Result<Value, DataError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut document = Map::new();

    loop {
        let closed = match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                stack.push(Element::open(&start)?);
                None
            }
            Event::Empty(start) => Some(Element::open(&start)?.close()),
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DataError::Xml("unexpected closing tag".to_string()))?;
                Some(element.close())
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().map_err(xml_error)?);
                }
                None
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some((name, value)) = closed {
            match stack.last_mut() {
                Some(parent) => attach(&mut parent.fields, name, value),
                None => attach(&mut document, name, value),
            }
        }
    }

    if !stack.is_empty() {
        return Err(DataError::Xml("unclosed element".to_string()));
    }
    if document.is_empty() {
        return Err(DataError::Xml("no root element".to_string()));
    }
    Ok(Value::Object(document))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Skips single-key wrappers such as `{"root": {"row": [...]}}`.
fn unwrap_single(value: &Value) -> (String, &Value) {
    let mut label = "value".to_string();
    let mut current = value;
    while let Value::Object(fields) = current {
        let mut entries = fields.iter();
        let (Some((key, inner)), None) = (entries.next(), entries.next()) else {
            break;
        };
        if !(inner.is_object() || inner.is_array()) {
            break;
        }
        label = key.clone();
        current = inner;
    }
    (label, current)
}

fn tabulate(value: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    let (label, value) = unwrap_single(value);
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let mut headers: Vec<String> = Vec::new();
            for fields in items.iter().filter_map(Value::as_object) {
                for key in fields.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
            }
            let rows = items
                .iter()
                .map(|item| {
                    headers
                        .iter()
                        .map(|h| item.get(h).map(cell_text).unwrap_or_default())
                        .collect()
                })
                .collect();
            (headers, rows)
        }
        Value::Array(items) => (vec![label], items.iter().map(|i| vec![cell_text(i)]).collect()),
        Value::Object(fields) => (
            fields.keys().cloned().collect(),
            vec![fields.values().map(cell_text).collect()],
        ),
        scalar => (vec![label], vec![vec![cell_text(scalar)]]),
    }
}

fn write_csv(value: &Value) -> Result<Vec<u8>, DataError> {
    let (headers, rows) = tabulate(value);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| DataError::Io(e.into_error()))
}

/// Makes `raw` usable as an XML element name.
fn element_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn write_xml(value: &Value, root: &str, item: &str) -> Result<Vec<u8>, DataError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut writer, root, value, item)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
    item: &str,
) -> Result<(), DataError> {
    let name = element_name(name);
    let tag = name.as_str();
    match value {
        Value::Null => writer
            .write_event(Event::Empty(BytesStart::new(tag)))
            .map_err(xml_error),
        Value::Object(fields) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(xml_error)?;
            for (key, child) in fields {
                write_element(writer, key, child, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(xml_error)
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(xml_error)?;
            for child in items {
                write_element(writer, item, child, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(xml_error)
        }
        scalar => {
            let text = cell_text(scalar);
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(xml_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn request(dir: &Path, content: &[u8], pair: FormatPair) -> StrategyRequest {
        let input = dir.join("5eed0123");
        std::fs::write(&input, content).unwrap();
        StrategyRequest {
            job_id: "job-d".to_string(),
            input_path: input,
            output_path: dir.join(format!("job-d.{}", pair.destination.extension())),
            pair,
        }
    }

    async fn run(content: &[u8], source: Format, destination: Format) -> (StrategyOutcome, String) {
        let temp = TempDir::new().unwrap();
        let request = request(temp.path(), content, FormatPair::new(source, destination));
        let outcome = DataStrategy::new()
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();
        let output = std::fs::read_to_string(&request.output_path).unwrap_or_default();
        (outcome, output)
    }

    #[test]
    fn test_supported_pairs() {
        assert!(DataStrategy::supports(Format::Csv, Format::Json));
        assert!(DataStrategy::supports(Format::Xlsx, Format::Json));
        assert!(DataStrategy::supports(Format::Txt, Format::Csv));
        assert!(!DataStrategy::supports(Format::Json, Format::Json));
        assert!(!DataStrategy::supports(Format::Json, Format::Xlsx));
        assert!(!DataStrategy::supports(Format::Pdf, Format::Json));
    }

    #[test]
    fn test_infer_cells() {
        assert_eq!(infer("42"), json!(42));
        assert_eq!(infer(" 2.5 "), json!(2.5));
        assert_eq!(infer(""), Value::Null);
        assert_eq!(infer("NaN"), json!("NaN"));
        assert_eq!(infer("Oslo"), json!("Oslo"));
    }

    #[test]
    fn test_parse_xml_attributes_and_repeats() {
        let xml = r#"<?xml version="1.0"?>
            <catalog>
              <book id="1"><title>Dune</title></book>
              <book id="2"><title>Emma &amp; Co</title></book>
              <empty/>
            </catalog>"#;

        assert_eq!(
            parse_xml(xml).unwrap(),
            json!({
                "catalog": {
                    "book": [
                        {"@id": "1", "title": "Dune"},
                        {"@id": "2", "title": "Emma & Co"}
                    ],
                    "empty": null
                }
            })
        );
    }

    #[test]
    fn test_parse_xml_rejects_unclosed() {
        assert!(parse_xml("<a><b></b>").is_err());
        assert!(parse_xml("   ").is_err());
    }

    #[test]
    fn test_tabulate_unwraps_xml_rows() {
        let value = json!({"rows": {"row": [{"a": "1", "b": "2"}, {"a": "3", "c": "4"}]}});
        let (headers, rows) = tabulate(&value);
        assert_eq!(headers, vec!["a", "b", "c"]);
        assert_eq!(rows, vec![vec!["1", "2", ""], vec!["3", "", "4"]]);
    }

    #[test]
    fn test_element_name_sanitizes() {
        assert_eq!(element_name("first name"), "first_name");
        assert_eq!(element_name("2024"), "_2024");
        assert_eq!(element_name("@id"), "_id");
        assert_eq!(element_name(""), "_");
    }

    #[tokio::test]
    async fn test_csv_to_json_records() {
        let (outcome, output) =
            run(b"city,population\nOslo,709000\nBergen,\n", Format::Csv, Format::Json).await;

        assert_eq!(outcome, StrategyOutcome::success());
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value,
            json!([
                {"city": "Oslo", "population": 709000},
                {"city": "Bergen", "population": null}
            ])
        );
    }

    #[tokio::test]
    async fn test_json_to_csv_keeps_key_order() {
        let (outcome, output) = run(
            br#"[{"name": "a", "size": 1}, {"name": "b", "size": 2, "tags": ["x"]}]"#,
            Format::Json,
            Format::Csv,
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(output, "name,size,tags\na,1,\nb,2,\"[\"\"x\"\"]\"\n");
    }

    #[tokio::test]
    async fn test_json_to_xml() {
        let (outcome, output) = run(
            br#"{"title": "Q3 <draft>", "items": [1, 2]}"#,
            Format::Json,
            Format::Xml,
        )
        .await;

        assert!(outcome.is_success());
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(output.contains("<title>Q3 &lt;draft&gt;</title>"));
        assert!(output.contains("<item>1</item>"));
        let parsed = parse_xml(&output).unwrap();
        assert_eq!(parsed["root"]["items"]["item"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn test_csv_to_xml_uses_rows() {
        let (outcome, output) = run(b"a,b\n1,x\n", Format::Csv, Format::Xml).await;

        assert!(outcome.is_success());
        let parsed = parse_xml(&output).unwrap();
        assert_eq!(parsed, json!({"data": {"row": {"a": "1", "b": "x"}}}));
    }

    #[tokio::test]
    async fn test_xml_to_csv() {
        let (outcome, output) = run(
            b"<people><person><name>Ann</name><age>31</age></person><person><name>Bo</name><age>7</age></person></people>",
            Format::Xml,
            Format::Csv,
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(output, "name,age\nAnn,31\nBo,7\n");
    }

    #[tokio::test]
    async fn test_txt_to_json_lines() {
        let (outcome, output) = run(b"first\n  second  \n", Format::Txt, Format::Json).await;

        assert!(outcome.is_success());
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!({"lines": ["first", "second"]}));
    }

    #[tokio::test]
    async fn test_malformed_input_is_soft_failure() {
        let (outcome, output) = run(b"{not json", Format::Json, Format::Csv).await;
        assert!(!outcome.is_success());
        assert!(output.is_empty());

        let (outcome, _) = run(&[0xff, 0xfe, 0x00], Format::Csv, Format::Json).await;
        assert_eq!(
            outcome,
            StrategyOutcome::soft_failure("input is not valid UTF-8")
        );
    }

    #[tokio::test]
    async fn test_corrupt_spreadsheet_is_soft_failure() {
        let temp = TempDir::new().unwrap();
        let request = request(
            temp.path(),
            b"definitely not a zip archive",
            FormatPair::new(Format::Xlsx, Format::Json),
        );

        let outcome = DataStrategy::new()
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert!(!request.output_path.exists());
        let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(leftovers, 1, "only the input remains");
    }

    #[tokio::test]
    async fn test_unsupported_pair() {
        let (outcome, _) = run(b"x", Format::Pdf, Format::Json).await;
        assert_eq!(
            outcome,
            StrategyOutcome::soft_failure("data conversion cannot handle PDF -> JSON")
        );
    }
}
