//! Paginated backup document codec.
//!
//! A document is a JSON array whose elements are pages, each page being a
//! JSON array of records. Every page is written on its own line:
//!
//! ```text
//! [
//! [{"PartitionKey":"a","RowKey":"1",...},...],
//! [{"PartitionKey":"b","RowKey":"7",...}]
//! ]
//! ```
//!
//! The whole document is valid JSON, yet both sides only ever hold one page
//! in memory: the encoder emits a page as soon as it is produced and the
//! decoder yields a page as soon as its line is complete. An empty table is
//! `[\n]\n`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::entity::PropertyValue;
use crate::storage::StoreRecord;

use super::error::DocumentError;

const OPEN: &[u8] = b"[";
const CLOSE: &[u8] = b"]";

/// Incremental writer side of the document format.
#[derive(Debug, Default)]
pub struct PageDocumentEncoder {
    pages_written: usize,
}

impl PageDocumentEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening bytes of the document.
    pub fn begin(&self) -> Bytes {
        Bytes::from_static(OPEN)
    }

    /// Encodes one page, including its separator.
    ///
    /// Non-finite doubles have no JSON form and are rejected.
    pub fn encode_page(&mut self, records: &[StoreRecord]) -> Result<Bytes, DocumentError> {
        if let Some((record, name)) = find_non_finite(records) {
            return Err(DocumentError::Encode(format!(
                "property '{name}' of {}/{} is not a finite number",
                record.partition_key, record.row_key
            )));
        }
        let json =
            serde_json::to_vec(records).map_err(|e| DocumentError::Encode(e.to_string()))?;
        let separator: &[u8] = if self.pages_written == 0 { b"\n" } else { b",\n" };

        let mut buf = BytesMut::with_capacity(separator.len() + json.len());
        buf.put_slice(separator);
        buf.put_slice(&json);
        self.pages_written += 1;
        Ok(buf.freeze())
    }

    /// Closing bytes of the document.
    pub fn end(self) -> Bytes {
        Bytes::from_static(b"\n]\n")
    }

    pub fn pages_written(&self) -> usize {
        self.pages_written
    }
}

fn find_non_finite(records: &[StoreRecord]) -> Option<(&StoreRecord, &str)> {
    records.iter().find_map(|record| {
        record.properties.iter().find_map(|(name, value)| match value {
            PropertyValue::Double(d) if !d.is_finite() => Some((record, name.as_str())),
            _ => None,
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Start,
    Pages,
    Closed,
}

/// Incremental reader side of the document format.
///
/// Feed raw (already decompressed) bytes with [`push`](Self::push); complete
/// pages are returned as soon as their line ends.
#[derive(Debug)]
pub struct PageDocumentDecoder {
    buffer: Vec<u8>,
    line: usize,
    state: DecodeState,
}

impl Default for PageDocumentDecoder {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            line: 0,
            state: DecodeState::Start,
        }
    }
}

impl PageDocumentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk and returns every page completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<StoreRecord>>, DocumentError> {
        self.buffer.extend_from_slice(chunk);

        let mut pages = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(page) = self.decode_line(&line[..newline])? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    /// Signals end of input. Returns the last page if the final line had no
    /// trailing newline, and fails if the document was not closed.
    pub fn finish(mut self) -> Result<Option<Vec<StoreRecord>>, DocumentError> {
        let rest = std::mem::take(&mut self.buffer);
        let page = self.decode_line(&rest)?;
        if self.state != DecodeState::Closed {
            return Err(DocumentError::Truncated);
        }
        Ok(page)
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Option<Vec<StoreRecord>>, DocumentError> {
        self.line += 1;
        let line = trim_ascii(line);
        if line.is_empty() {
            return Ok(None);
        }

        match self.state {
            DecodeState::Start if line == OPEN => {
                self.state = DecodeState::Pages;
                Ok(None)
            }
            DecodeState::Pages if line == CLOSE => {
                self.state = DecodeState::Closed;
                Ok(None)
            }
            DecodeState::Pages => {
                let json = line.strip_suffix(b",").unwrap_or(line);
                serde_json::from_slice(json)
                    .map(Some)
                    .map_err(|e| self.decode_error(e.to_string()))
            }
            DecodeState::Start => Err(self.decode_error("expected '[' to open the document")),
            DecodeState::Closed => Err(self.decode_error("unexpected content after ']'")),
        }
    }

    fn decode_error(&self, reason: impl Into<String>) -> DocumentError {
        DocumentError::Decode {
            line: self.line,
            reason: reason.into(),
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pk: &str, rk: &str) -> StoreRecord {
        StoreRecord::new(pk, rk).with_property("Name", PropertyValue::String(format!("{pk}{rk}")))
    }

    fn encode(pages: &[Vec<StoreRecord>]) -> Vec<u8> {
        let mut encoder = PageDocumentEncoder::new();
        let mut out = encoder.begin().to_vec();
        for page in pages {
            out.extend_from_slice(&encoder.encode_page(page).unwrap());
        }
        out.extend_from_slice(&encoder.end());
        out
    }

    fn decode(bytes: &[u8], chunk_size: usize) -> Vec<Vec<StoreRecord>> {
        let mut decoder = PageDocumentDecoder::new();
        let mut pages = Vec::new();
        for chunk in bytes.chunks(chunk_size) {
            pages.extend(decoder.push(chunk).unwrap());
        }
        pages.extend(decoder.finish().unwrap());
        pages
    }

    #[test]
    fn test_non_finite_double_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let page = vec![record("a", "1").with_property("Value", PropertyValue::Double(bad))];
            let mut encoder = PageDocumentEncoder::new();
            let result = encoder.encode_page(&page);
            assert!(matches!(result, Err(DocumentError::Encode(_))));
            assert_eq!(encoder.pages_written(), 0);
        }
    }

    #[test]
    fn test_doubles_survive_exactly() {
        let value = 188168.53578224801_f64;
        let page = vec![record("a", "1").with_property("Value", PropertyValue::Double(value))];
        let pages = decode(&encode(&[page]), 7);
        assert_eq!(
            pages[0][0].properties.get("Value"),
            Some(&PropertyValue::Double(value))
        );
    }

    #[test]
    fn test_empty_document() {
        let bytes = encode(&[]);
        assert_eq!(bytes, b"[\n]\n");
        assert!(decode(&bytes, 3).is_empty());
    }

    #[test]
    fn test_document_is_valid_json() {
        let pages = vec![vec![record("a", "1"), record("a", "2")], vec![record("b", "1")]];
        let bytes = encode(&pages);
        let parsed: Vec<Vec<StoreRecord>> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, pages);
    }

    #[test]
    fn test_one_page_per_line() {
        let bytes = encode(&[vec![record("a", "1")], vec![record("b", "2")]]);
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[");
        assert!(lines[1].starts_with("[{") && lines[1].ends_with("],"));
        assert!(lines[2].ends_with(']') && !lines[2].ends_with("],"));
        assert_eq!(lines[3], "]");
    }

    #[test]
    fn test_decode_across_chunk_boundaries() {
        let pages = vec![
            vec![record("a", "1"), record("a", "2")],
            vec![record("b", "1")],
            vec![record("c", "1")],
        ];
        let bytes = encode(&pages);
        for chunk_size in [1, 7, 64, bytes.len()] {
            assert_eq!(decode(&bytes, chunk_size), pages);
        }
    }

    #[test]
    fn test_pages_yielded_before_end() {
        let bytes = encode(&[vec![record("a", "1")], vec![record("b", "1")]]);
        let text = String::from_utf8(bytes).unwrap();
        let first_two_lines: usize = text.lines().take(2).map(|l| l.len() + 1).sum();

        let mut decoder = PageDocumentDecoder::new();
        let pages = decoder.push(&text.as_bytes()[..first_two_lines]).unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_truncated_document() {
        let bytes = encode(&[vec![record("a", "1")]]);
        let mut decoder = PageDocumentDecoder::new();
        decoder.push(&bytes[..bytes.len() - 3]).unwrap();
        assert_eq!(decoder.finish(), Err(DocumentError::Truncated));
    }

    #[test]
    fn test_missing_open_bracket() {
        let mut decoder = PageDocumentDecoder::new();
        let result = decoder.push(b"{\"PartitionKey\":\"a\"}\n");
        assert!(matches!(result, Err(DocumentError::Decode { line: 1, .. })));
    }

    #[test]
    fn test_malformed_page() {
        let mut decoder = PageDocumentDecoder::new();
        let result = decoder.push(b"[\n[{\"PartitionKey\":\n");
        assert!(matches!(result, Err(DocumentError::Decode { line: 2, .. })));
    }

    #[test]
    fn test_content_after_close() {
        let mut decoder = PageDocumentDecoder::new();
        let result = decoder.push(b"[\n]\n[]\n");
        assert!(matches!(result, Err(DocumentError::Decode { line: 3, .. })));
    }

    #[test]
    fn test_tolerates_crlf_and_missing_final_newline() {
        let mut decoder = PageDocumentDecoder::new();
        let pages = decoder
            .push(b"[\r\n[{\"PartitionKey\":\"a\",\"RowKey\":\"1\"}]\r\n]")
            .unwrap();
        assert_eq!(pages, vec![vec![StoreRecord::new("a", "1")]]);
        assert_eq!(decoder.finish(), Ok(None));
    }
}
