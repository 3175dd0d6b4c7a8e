//! Input sources and the record stream handed to mappers.
//!
//! A job declares one [`Format`] and one or more [`Source`]s. [`Records`]
//! walks the sources in the order they were listed, reads each one fully
//! when it is reached and decodes it into [`Record`]s whose variant is fixed
//! by the format. Every record travels with the [`Location`] it was read
//! from so that failures further down the pipeline can say where they
//! happened.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::sink::Encoding;
use crate::utils;

/////////////////////////////////////////////////////////////////////////////
// Formats and sources
/////////////////////////////////////////////////////////////////////////////

/// The declared shape of a job's input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// One [`Record::Line`] per line.
    Text,
    /// One [`Record::Row`] per CSV row, first row included.
    Csv,
    /// Like [`Format::Csv`], but the first row of every source is a header
    /// and is left out of the stream.
    CsvSkipFirstLine,
    /// One [`Record::Json`] per line of line-delimited JSON.
    Json,
    /// The attributes of every `row` child of the document root.
    XmlRow,
    /// Precomputed `(filename, pixels)` pairs.
    Image,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Text,
        Format::Csv,
        Format::CsvSkipFirstLine,
        Format::Json,
        Format::XmlRow,
        Format::Image,
    ];

    /// The canonical tag of this format.
    pub fn name(self) -> &'static str {
        match self {
            Format::Text => "TEXT",
            Format::Csv => "CSV",
            Format::CsvSkipFirstLine => "CSV-SkipFirstLine",
            Format::Json => "JSON",
            Format::XmlRow => "XML-ROW",
            Format::Image => "IMAGE",
        }
    }

    /// How results of a job reading this format are written out.
    pub fn encoding(self) -> Encoding {
        match self {
            Format::Json => Encoding::Json,
            _ => Encoding::Text,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown input format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            // Legacy tag for StackExchange dumps.
            "SOXML" => Ok(Format::XmlRow),
            _ => Format::ALL
                .into_iter()
                .find(|format| format.name().eq_ignore_ascii_case(s))
                .ok_or_else(|| UnknownFormat(s.to_string())),
        }
    }
}

/// An image whose pixel array was computed before the job started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub pixels: Vec<u8>,
}

/// Where a job's records come from.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    /// A file on disk.
    File(PathBuf),
    /// Text held in memory under a display name.
    Inline { name: String, data: String },
    /// Images decoded by the caller. Only valid for [`Format::Image`].
    Images(Vec<Image>),
}

impl Source {
    pub fn inline(name: impl Into<String>, data: impl Into<String>) -> Self {
        Source::Inline {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Name used for this source in logs and error messages.
    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Inline { name, .. } => name.clone(),
            Source::Images(_) => "<images>".to_string(),
        }
    }

    /// Reads the whole source as text.
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            Source::File(path) => utils::read_to_string(path),
            Source::Inline { data, .. } => Ok(data.clone()),
            Source::Images(_) => Err(Error::parse(
                Location::new(self.name(), 1),
                "an image list has no text content",
            )),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

/////////////////////////////////////////////////////////////////////////////
// Records
/////////////////////////////////////////////////////////////////////////////

/// One unit of input handed to a mapper.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Line(String),
    /// A CSV row. `source` is the position of the input it came from in the
    /// job's source list.
    Row {
        source: usize,
        fields: Vec<String>,
    },
    Json(serde_json::Value),
    Attributes(BTreeMap<String, String>),
    Image(Image),
}

/// The input and line a record was read from.
///
/// For image lists the "line" is the 1-based position of the image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub input: Arc<str>,
    pub line: u64,
}

impl Location {
    pub fn new(input: impl Into<Arc<str>>, line: u64) -> Self {
        Self {
            input: input.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.input, self.line)
    }
}

type Decoded = Box<dyn Iterator<Item = Result<(Location, Record)>>>;

/// The record stream of a job: a single forward pass over every source.
pub struct Records {
    format: Format,
    pending: VecDeque<(usize, Source)>,
    current: Option<Decoded>,
}

impl Records {
    pub fn new(sources: impl IntoIterator<Item = Source>, format: Format) -> Self {
        Self {
            format,
            pending: sources.into_iter().enumerate().collect(),
            current: None,
        }
    }
}

impl Iterator for Records {
    type Item = Result<(Location, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Err(err)) => {
                        self.pending.clear();
                        self.current = None;
                        return Some(Err(err));
                    }
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }

            let (index, source) = self.pending.pop_front()?;
            debug!("reading input `{}` as {}", source.name(), self.format);
            match decode(self.format, index, source) {
                Ok(records) => self.current = Some(records),
                Err(err) => {
                    self.pending.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Reads the first row of a CSV source.
///
/// Callers of [`Format::CsvSkipFirstLine`] jobs use this to map column
/// names to positions before the job starts.
pub fn read_header(source: &Source) -> Result<Vec<String>> {
    let location = Location::new(source.name(), 1);
    let data = source.read_to_string()?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());
    match reader.records().next() {
        Some(Ok(row)) => Ok(row.iter().map(str::to_owned).collect()),
        Some(Err(err)) => Err(Error::parse(location, format!("malformed CSV header: {err}"))),
        None => Err(Error::parse(location, "missing header row")),
    }
}

fn decode(format: Format, index: usize, source: Source) -> Result<Decoded> {
    let input: Arc<str> = source.name().into();
    let data = match source {
        Source::Images(images) if format == Format::Image => return Ok(image_entries(input, images)),
        Source::Images(_) => {
            return Err(Error::parse(
                Location::new(input, 1),
                format!("an image list cannot be read as {format}"),
            ))
        }
        source => source.read_to_string()?,
    };

    match format {
        Format::Text => Ok(text_lines(input, data)),
        Format::Csv => Ok(csv_rows(input, index, data, false)),
        Format::CsvSkipFirstLine => Ok(csv_rows(input, index, data, true)),
        Format::Json => Ok(json_lines(input, data)),
        Format::XmlRow => xml_rows(input, &data),
        Format::Image => Err(Error::parse(
            Location::new(input, 1),
            "IMAGE input must be a precomputed image list",
        )),
    }
}

fn image_entries(input: Arc<str>, images: Vec<Image>) -> Decoded {
    Box::new(
        images
            .into_iter()
            .zip(1u64..)
            .map(move |(image, n)| Ok((Location::new(input.clone(), n), Record::Image(image)))),
    )
}

fn text_lines(input: Arc<str>, data: String) -> Decoded {
    let lines: Vec<String> = data.lines().map(str::to_owned).collect();
    Box::new(
        lines
            .into_iter()
            .zip(1u64..)
            .map(move |(line, n)| Ok((Location::new(input.clone(), n), Record::Line(line)))),
    )
}

fn json_lines(input: Arc<str>, data: String) -> Decoded {
    let lines: Vec<String> = data.lines().map(str::to_owned).collect();
    Box::new(lines.into_iter().zip(1u64..).map(move |(line, n)| {
        let location = Location::new(input.clone(), n);
        match serde_json::from_str(&line) {
            Ok(value) => Ok((location, Record::Json(value))),
            Err(err) => Err(Error::parse(location, format!("invalid JSON: {err}"))),
        }
    }))
}

fn csv_rows(input: Arc<str>, source: usize, data: String, skip_header: bool) -> Decoded {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(data.into_bytes()));

    let mut header_width = None;
    let rows = reader
        .into_records()
        .enumerate()
        .filter_map(move |(n, row)| {
            let line = match &row {
                Ok(row) => row.position().map(|pos| pos.line()),
                Err(err) => err.position().map(|pos| pos.line()),
            }
            .unwrap_or(n as u64 + 1);
            let location = Location::new(input.clone(), line);

            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    return Some(Err(Error::parse(location, format!("malformed CSV row: {err}"))))
                }
            };

            if skip_header {
                match header_width {
                    None => {
                        header_width = Some(row.len());
                        return None;
                    }
                    Some(width) if row.len() < width => {
                        return Some(Err(Error::parse(
                            location,
                            format!("row has {} fields but the header declares {width}", row.len()),
                        )))
                    }
                    Some(_) => {}
                }
            }

            let fields = row.iter().map(str::to_owned).collect();
            Some(Ok((location, Record::Row { source, fields })))
        });
    Box::new(rows)
}

fn xml_rows(input: Arc<str>, data: &str) -> Result<Decoded> {
    let mut reader = Reader::from_str(data);
    let mut rows = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let offset = position(&reader, data);
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                let line = line_at(data, position(&reader, data));
                return Err(Error::parse(
                    Location::new(input, line),
                    format!("malformed XML: {err}"),
                ));
            }
        };

        match event {
            Event::Start(_) | Event::Empty(_) if depth == 0 && seen_root => {
                return Err(Error::parse(
                    Location::new(input, line_at(data, offset)),
                    "content after root element",
                ));
            }
            Event::Start(element) => {
                if depth == 1 && is_row(&element) {
                    rows.push(xml_row(&input, data, offset, &element)?);
                }
                seen_root = true;
                depth += 1;
            }
            Event::Empty(element) => {
                if depth == 1 && is_row(&element) {
                    rows.push(xml_row(&input, data, offset, &element)?);
                }
                seen_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    let end = Location::new(input, line_at(data, data.len()));
    if !seen_root {
        return Err(Error::parse(end, "XML document has no root element"));
    }
    if depth > 0 {
        return Err(Error::parse(end, "XML document ends inside an open element"));
    }
    Ok(Box::new(rows.into_iter().map(Ok)))
}

fn is_row(element: &BytesStart<'_>) -> bool {
    element.name().as_ref() == b"row"
}

fn xml_row(
    input: &Arc<str>,
    data: &str,
    offset: usize,
    element: &BytesStart<'_>,
) -> Result<(Location, Record)> {
    let location = Location::new(input.clone(), line_at(data, offset));
    let mut attributes = BTreeMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|err| Error::parse(location.clone(), format!("bad attribute: {err}")))?;
        let value = attr
            .unescape_value()
            .map_err(|err| Error::parse(location.clone(), format!("bad attribute value: {err}")))?;
        attributes.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        );
    }
    Ok((location, Record::Attributes(attributes)))
}

fn position(reader: &Reader<&[u8]>, data: &str) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(data.len())
}

fn line_at(data: &str, offset: usize) -> u64 {
    let end = offset.min(data.len());
    data.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u64 + 1
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn collect(sources: Vec<Source>, format: Format) -> Result<Vec<Record>> {
        Records::new(sources, format)
            .map(|item| item.map(|(_, record)| record))
            .collect()
    }

    fn row(source: usize, fields: &[&str]) -> Record {
        Record::Row {
            source,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn format_tags_round_trip_through_their_names() {
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>(), Ok(format));
        }
        assert_eq!("SOXML".parse::<Format>(), Ok(Format::XmlRow));
        assert_eq!(
            "YAML".parse::<Format>(),
            Err(UnknownFormat("YAML".to_string()))
        );
    }

    #[test]
    fn text_yields_one_record_per_line() {
        let records = collect(
            vec![Source::inline("a.txt", "the cat sat\r\nthe dog ran\n")],
            Format::Text,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                Record::Line("the cat sat".to_string()),
                Record::Line("the dog ran".to_string()),
            ]
        );
    }

    #[test]
    fn csv_keeps_header_and_ragged_rows() {
        let records = collect(
            vec![Source::inline("books.csv", "a,b,c\nb,a\n\"x,y\",z\n")],
            Format::Csv,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                row(0, &["a", "b", "c"]),
                row(0, &["b", "a"]),
                row(0, &["x,y", "z"]),
            ]
        );
    }

    #[test]
    fn skip_first_line_drops_each_header() {
        let records = collect(
            vec![
                Source::inline("users.csv", "Id,Name\n1,ann\n"),
                Source::inline("posts.csv", "Id,OwnerUserId\n10,1\n11,1\n"),
            ],
            Format::CsvSkipFirstLine,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![row(0, &["1", "ann"]), row(1, &["10", "1"]), row(1, &["11", "1"])]
        );
    }

    #[test]
    fn short_row_is_a_parse_error() {
        let mut records = Records::new(
            vec![Source::inline("posts.csv", "Id,Title,AnswerCount\n1,hi,0\n2,short\n")],
            Format::CsvSkipFirstLine,
        );
        assert!(records.next().unwrap().is_ok());
        match records.next() {
            Some(Err(Error::Parse { location, .. })) => {
                assert_eq!(location, Location::new("posts.csv", 3));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert!(records.next().is_none());
    }

    #[test]
    fn json_lines_decode_until_the_first_bad_line() {
        let mut records = Records::new(
            vec![Source::inline("docs.json", "[\"d1\", \"a b\"]\n{not json}\n[1]\n")],
            Format::Json,
        );
        let (_, first) = records.next().unwrap().unwrap();
        assert_eq!(first, Record::Json(serde_json::json!(["d1", "a b"])));
        assert!(matches!(
            records.next(),
            Some(Err(Error::Parse { location, .. })) if location.line == 2
        ));
        assert!(records.next().is_none());
    }

    #[test]
    fn xml_rows_are_attribute_maps_of_root_children() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<posts>
  <row Id="1" Title="Fish &amp; chips" />
  <comment Id="9" />
  <row Id="2"><row Id="nested" /></row>
</posts>
"#;
        let items: Vec<_> = Records::new(vec![Source::inline("Posts.xml", xml)], Format::XmlRow)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items.len(), 2);

        let (location, first) = &items[0];
        assert_eq!(location.line, 3);
        let mut expected = BTreeMap::new();
        expected.insert("Id".to_string(), "1".to_string());
        expected.insert("Title".to_string(), "Fish & chips".to_string());
        assert_eq!(first, &Record::Attributes(expected));

        match &items[1].1 {
            Record::Attributes(attrs) => assert_eq!(attrs["Id"], "2"),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        for xml in [
            "<posts><row Id=\"1\"></posts>",
            "",
            "<posts><row Id=\"1\" />",
            "<posts></posts><extra><row Id=\"1\" /></extra>",
            "<posts /><row Id=\"1\" />",
        ] {
            let result = collect(vec![Source::inline("bad.xml", xml)], Format::XmlRow);
            assert!(matches!(result, Err(Error::Parse { .. })), "{xml:?} parsed");
        }
    }

    #[test]
    fn images_pass_through_unchanged() {
        let images = vec![
            Image {
                name: "f1".to_string(),
                pixels: vec![1, 2, 3],
            },
            Image {
                name: "f2".to_string(),
                pixels: vec![1, 2, 3],
            },
        ];
        let records = collect(vec![Source::Images(images.clone())], Format::Image).unwrap();
        assert_eq!(records, images.into_iter().map(Record::Image).collect::<Vec<_>>());

        let mismatched = collect(vec![Source::inline("list.txt", "f1\n")], Format::Image);
        assert!(matches!(mismatched, Err(Error::Parse { .. })));
        let mismatched = collect(vec![Source::Images(Vec::new())], Format::Text);
        assert!(matches!(mismatched, Err(Error::Parse { .. })));
    }

    #[test]
    fn sources_are_read_in_listed_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from file").unwrap();
        let records = collect(
            vec![
                Source::inline("first", "one\ntwo"),
                Source::File(file.path().to_path_buf()),
                Source::inline("last", "three"),
            ],
            Format::Text,
        )
        .unwrap();
        let lines: Vec<_> = records
            .into_iter()
            .map(|record| match record {
                Record::Line(line) => line,
                other => panic!("unexpected record {other:?}"),
            })
            .collect();
        assert_eq!(lines, ["one", "two", "from file", "three"]);
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let result = collect(
            vec![Source::inline("ok", "fine"), Source::File(missing)],
            Format::Text,
        );
        assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    }

    #[test]
    fn non_utf8_text_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9 au lait\n").unwrap();
        let result = collect(vec![Source::File(file.path().to_path_buf())], Format::Text);
        match result {
            Err(Error::Parse { location, .. }) => assert_eq!(location.line, 1),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn header_is_read_from_the_first_row() {
        let source = Source::inline("posts.csv", "TableName,Id,Title\nPOSTS,1,hello\n");
        assert_eq!(read_header(&source).unwrap(), ["TableName", "Id", "Title"]);
        assert!(matches!(
            read_header(&Source::inline("empty.csv", "")),
            Err(Error::Parse { .. })
        ));
    }
}
