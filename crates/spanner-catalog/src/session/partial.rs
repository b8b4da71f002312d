//! Incremental decoder for `executeStreamingSql` responses.
//!
//! Over REST the stream arrives as one JSON array of `PartialResultSet`
//! objects, split across HTTP chunks at arbitrary byte boundaries:
//!
//! ```text
//! [{"metadata":{...},"values":["1","Ma"],"chunkedValue":true},
//!  {"values":["rc","2",...]}]
//! ```
//!
//! Values are flat; every `fields.len()` of them form one row. When
//! `chunkedValue` is set the last value is incomplete and continues in the
//! first value of the next element: strings concatenate, lists merge their
//! boundary elements when those are strings or lists and append otherwise.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use serde::Deserialize;
use serde_json::Value as WireValue;

use crate::error::{CatalogError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetadata {
    #[serde(default)]
    row_type: Option<StructType>,
}

#[derive(Debug, Default, Deserialize)]
struct StructType {
    #[serde(default)]
    fields: Vec<StructField>,
}

#[derive(Debug, Default, Deserialize)]
struct StructField {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialResultSet {
    #[serde(default)]
    metadata: Option<ResultSetMetadata>,
    #[serde(default)]
    values: Vec<WireValue>,
    #[serde(default)]
    chunked_value: bool,
}

/// Decoder state for one streamed result.
pub(crate) struct PartialResultDecoder {
    buffer: BytesMut,
    scan_pos: usize,
    depth: u32,
    in_string: bool,
    escaped: bool,
    element_start: Option<usize>,

    fields: Option<Arc<[String]>>,
    values: VecDeque<WireValue>,
    chunk: Option<WireValue>,
    context: String,
}

impl PartialResultDecoder {
    pub(crate) fn new(context: impl Into<String>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            scan_pos: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            element_start: None,
            fields: None,
            values: VecDeque::new(),
            chunk: None,
            context: context.into(),
        }
    }

    /// Append bytes received from the response body.
    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Column names, once the metadata element has arrived.
    pub(crate) fn fields(&self) -> Option<Arc<[String]>> {
        self.fields.clone()
    }

    /// Next complete row, or `None` when more input is needed.
    pub(crate) fn next_row(&mut self) -> Result<Option<Vec<WireValue>>> {
        loop {
            if let Some(row) = self.take_row() {
                return Ok(Some(row));
            }
            match self.next_element()? {
                Some(part) => self.absorb(part)?,
                None => return Ok(None),
            }
        }
    }

    /// Check that the body ended cleanly after the last row was taken.
    pub(crate) fn finish(&self) -> Result<()> {
        if self.depth != 0 || self.in_string || self.element_start.is_some() {
            return Err(self.error("result stream ended mid-element"));
        }
        if self.chunk.is_some() {
            return Err(self.error("result stream ended inside a chunked value"));
        }
        if !self.values.is_empty() {
            return Err(self.error(format!(
                "result stream ended with {} values of an incomplete row",
                self.values.len()
            )));
        }
        if self.buffer[self.scan_pos..]
            .iter()
            .any(|b| !b.is_ascii_whitespace())
        {
            return Err(self.error("trailing bytes after result stream"));
        }
        Ok(())
    }

    fn take_row(&mut self) -> Option<Vec<WireValue>> {
        let width = self.fields.as_ref().map_or(0, |f| f.len());
        if width == 0 || self.values.len() < width {
            return None;
        }
        Some(self.values.drain(..width).collect())
    }

    /// Scan for the next complete top-level array element.
    fn next_element(&mut self) -> Result<Option<PartialResultSet>> {
        while self.scan_pos < self.buffer.len() {
            let pos = self.scan_pos;
            let b = self.buffer[pos];
            self.scan_pos += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'[' | b'{' => {
                    if self.depth == 1 && self.element_start.is_none() {
                        self.element_start = Some(pos);
                    }
                    self.depth += 1;
                }
                b']' | b'}' => {
                    if self.depth == 0 {
                        return Err(self.error("unbalanced result stream"));
                    }
                    self.depth -= 1;
                    if self.depth == 1 {
                        if let Some(start) = self.element_start.take() {
                            self.buffer.advance(start);
                            let element = self.buffer.split_to(pos + 1 - start);
                            self.scan_pos = 0;
                            return self.parse_element(&element).map(Some);
                        }
                    }
                }
                _ => {}
            }
        }

        // Drop separators between elements once they are scanned.
        if self.element_start.is_none() && !self.in_string {
            let consumed = self
                .buffer
                .iter()
                .take(self.scan_pos)
                .take_while(|b| b.is_ascii_whitespace() || matches!(b, b'[' | b',' | b']'))
                .count();
            self.buffer.advance(consumed);
            self.scan_pos -= consumed;
        }
        Ok(None)
    }

    fn parse_element(&self, raw: &[u8]) -> Result<PartialResultSet> {
        let value: WireValue = serde_json::from_slice(raw)
            .map_err(|e| self.error(format!("malformed result element: {}", e)))?;
        if let Some(message) = value["error"]["message"].as_str() {
            return Err(self.error(message.to_string()));
        }
        serde_json::from_value(value)
            .map_err(|e| self.error(format!("malformed result element: {}", e)))
    }

    fn absorb(&mut self, part: PartialResultSet) -> Result<()> {
        if self.fields.is_none() {
            if let Some(row_type) = part.metadata.and_then(|m| m.row_type) {
                self.fields = Some(row_type.fields.into_iter().map(|f| f.name).collect());
            }
        }

        let mut values = part.values;
        if !values.is_empty() && self.fields.is_none() {
            return Err(self.error("result values arrived before metadata"));
        }

        if let Some(head) = self.chunk.take() {
            if values.is_empty() {
                self.chunk = Some(head);
            } else {
                let tail = values.remove(0);
                values.insert(0, self.merge(head, tail)?);
            }
        }
        if part.chunked_value {
            match values.pop() {
                Some(last) => self.chunk = Some(last),
                None if self.chunk.is_some() => {}
                None => return Err(self.error("chunked element carries no values")),
            }
        }
        self.values.extend(values);
        Ok(())
    }

    fn merge(&self, head: WireValue, tail: WireValue) -> Result<WireValue> {
        match (head, tail) {
            (WireValue::String(mut a), WireValue::String(b)) => {
                a.push_str(&b);
                Ok(WireValue::String(a))
            }
            (WireValue::Array(mut a), WireValue::Array(b)) => {
                let mut rest = b.into_iter();
                match (a.pop(), rest.next()) {
                    (Some(last), Some(first)) if mergeable(&last, &first) => {
                        a.push(self.merge(last, first)?);
                    }
                    (last, first) => a.extend(last.into_iter().chain(first)),
                }
                a.extend(rest);
                Ok(WireValue::Array(a))
            }
            (head, tail) => Err(self.error(format!(
                "cannot merge chunked values {} and {}",
                head, tail
            ))),
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> CatalogError {
        CatalogError::query(message, self.context.clone())
    }
}

fn mergeable(a: &WireValue, b: &WireValue) -> bool {
    matches!(
        (a, b),
        (WireValue::String(_), WireValue::String(_)) | (WireValue::Array(_), WireValue::Array(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STREAM: &str = r#"[{"metadata":{"rowType":{"fields":[{"name":"Id","type":{"code":"INT64"}},{"name":"Name","type":{"code":"STRING"}}]}},"values":["1","Ma"],"chunkedValue":true},
{"values":["rc \"the\" ]singer[","2",null]},
{"values":[],"resumeToken":"AQ=="}]"#;

    fn drain(decoder: &mut PartialResultDecoder) -> Vec<Vec<WireValue>> {
        let mut rows = Vec::new();
        while let Some(row) = decoder.next_row().unwrap() {
            rows.push(row);
        }
        rows
    }

    fn expected() -> Vec<Vec<WireValue>> {
        vec![
            vec![json!("1"), json!("Marc \"the\" ]singer[")],
            vec![json!("2"), json!(null)],
        ]
    }

    #[test]
    fn test_whole_body() {
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(STREAM.as_bytes());
        assert_eq!(drain(&mut decoder), expected());
        decoder.finish().unwrap();
        assert_eq!(
            decoder.fields().as_deref(),
            Some(&["Id".to_string(), "Name".to_string()][..])
        );
    }

    #[test]
    fn test_every_split_point() {
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = PartialResultDecoder::new("SELECT");
            decoder.extend(&bytes[..split]);
            let mut rows = drain(&mut decoder);
            decoder.extend(&bytes[split..]);
            rows.extend(drain(&mut decoder));
            assert_eq!(rows, expected(), "split at {}", split);
            decoder.finish().unwrap();
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut decoder = PartialResultDecoder::new("SELECT");
        let mut rows = Vec::new();
        for b in STREAM.as_bytes() {
            decoder.extend(std::slice::from_ref(b));
            rows.extend(drain(&mut decoder));
        }
        assert_eq!(rows, expected());
        decoder.finish().unwrap();
    }

    #[test]
    fn test_chunked_list_merges_boundary_strings() {
        let body = r#"[{"metadata":{"rowType":{"fields":[{"name":"Tags"}]}},"values":[["a","b"]],"chunkedValue":true},{"values":[["c","d"]]}]"#;
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(body.as_bytes());
        assert_eq!(drain(&mut decoder), vec![vec![json!(["a", "bc", "d"])]]);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_chunked_list_appends_scalars() {
        let body = r#"[{"metadata":{"rowType":{"fields":[{"name":"Ids"}]}},"values":[["1",null]],"chunkedValue":true},{"values":[[true]]}]"#;
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(body.as_bytes());
        assert_eq!(drain(&mut decoder), vec![vec![json!(["1", null, true])]]);
    }

    #[test]
    fn test_empty_result() {
        let body = r#"[{"metadata":{"rowType":{"fields":[{"name":"A"}]}}}]"#;
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(body.as_bytes());
        assert!(drain(&mut decoder).is_empty());
        decoder.finish().unwrap();
    }

    #[test]
    fn test_truncated_stream_fails() {
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(&STREAM.as_bytes()[..STREAM.len() / 2]);
        let _ = drain(&mut decoder);
        assert!(matches!(decoder.finish(), Err(CatalogError::Query { .. })));
    }

    #[test]
    fn test_incomplete_row_fails() {
        let body = r#"[{"metadata":{"rowType":{"fields":[{"name":"A"},{"name":"B"}]}},"values":["1"]}]"#;
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(body.as_bytes());
        assert!(drain(&mut decoder).is_empty());
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_error_element_fails() {
        let body = r#"[{"error":{"code":10,"message":"Transaction was aborted."}}]"#;
        let mut decoder = PartialResultDecoder::new("SELECT * FROM `T`");
        decoder.extend(body.as_bytes());
        match decoder.next_row() {
            Err(CatalogError::Query { message, context }) => {
                assert_eq!(message, "Transaction was aborted.");
                assert_eq!(context, "SELECT * FROM `T`");
            }
            other => panic!("expected query error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_values_before_metadata_fail() {
        let mut decoder = PartialResultDecoder::new("SELECT");
        decoder.extend(br#"[{"values":["1"]}]"#);
        assert!(decoder.next_row().is_err());
    }
}
