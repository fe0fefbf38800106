//! Tabular decoder: CSV text to header-keyed rows.
//!
//! The header is the first record. Quoted fields, doubled quotes and newlines
//! inside quotes follow the usual spreadsheet dialect. Rows whose cells are all
//! empty are dropped before they reach coercion.

use crate::coerce::{Coercer, Raw};
use crate::config::{FieldGroup, Schema};
use crate::error::{LoadError, RowRef};
use crate::value::{Entity, Value};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::collections::HashMap;
use std::ops::Range;

/// Key column of a key/value table.
pub const KV_KEY_COLUMN: &str = "Key";
/// Value column of a key/value table.
pub const KV_VALUE_COLUMN: &str = "Value";

/// One data row: header name to raw cell text, in header order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    line: u64,
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Cell by 0-based column position.
    pub fn cell(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Decoded CSV text. Rows are produced lazily and `rows()` may be called again
/// to restart from the first data row.
#[derive(Clone, Debug)]
pub struct Table {
    text: String,
    headers: Vec<String>,
}

impl Table {
    pub fn parse(text: &str) -> Result<Table, LoadError> {
        let text = normalize(text);
        let headers = read_headers(&text)?;
        Ok(Table { text, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn rows(&self) -> Rows<'_> {
        let reader = builder().from_reader(self.text.as_bytes());
        Rows {
            records: reader.into_records(),
            headers: &self.headers,
        }
    }

    /// `(key, value, line)` triples of a `Key,Value` table. Other columns are ignored.
    pub fn key_values(&self) -> Result<Vec<(String, String, u64)>, LoadError> {
        for column in [KV_KEY_COLUMN, KV_VALUE_COLUMN] {
            if !self.has_column(column) {
                return Err(LoadError::MalformedTable {
                    at: Some(RowRef::Line(1)),
                    reason: format!("key/value table needs a '{}' column", column),
                });
            }
        }
        let mut out = Vec::new();
        for row in self.rows() {
            let row = row?;
            let key = row.get(KV_KEY_COLUMN).unwrap_or_default().trim().to_string();
            if key.is_empty() {
                return Err(LoadError::MalformedTable {
                    at: Some(RowRef::Line(row.line())),
                    reason: "empty key".into(),
                });
            }
            let value = row.get(KV_VALUE_COLUMN).unwrap_or_default().to_string();
            out.push((key, value, row.line()));
        }
        Ok(out)
    }
}

/// Decode CSV text into one entity per non-blank row. Column groups follow the
/// named fields.
pub fn decode_table(text: &str, schema: &Schema, coercer: &Coercer) -> Result<Vec<(RowRef, Entity)>, LoadError> {
    let table = Table::parse(text)?;
    let spans = group_spans(&table, schema)?;
    let mut out = Vec::new();
    for row in table.rows() {
        let row = row?;
        let at = RowRef::Line(row.line());
        let decode = || -> Result<Entity, LoadError> {
            let mut entity = coercer.entity(schema, |name| row.get(name).map(Raw::Text).unwrap_or(Raw::Absent))?;
            for (group, span) in &spans {
                let cells: Vec<&str> = span.clone().filter_map(|i| row.cell(i)).collect();
                entity.push(group.name.clone(), coercer.group_text(group, &cells)?);
            }
            Ok(entity)
        };
        let entity = decode().map_err(|e| e.at(at.clone()))?;
        out.push((at, entity));
    }
    Ok(out)
}

fn group_spans<'s>(table: &Table, schema: &'s Schema) -> Result<Vec<(&'s FieldGroup, Range<usize>)>, LoadError> {
    let width = table.headers().len();
    schema
        .groups
        .iter()
        .map(|g| {
            g.columns(width).map(|span| (g, span)).ok_or_else(|| LoadError::MalformedTable {
                at: Some(RowRef::Line(1)),
                reason: format!("group '{}' does not fit {} header columns", g.name, width),
            })
        })
        .collect()
}

/// Decode a `Key,Value` table into one entity; each row supplies the field named by its key.
pub fn decode_key_values(text: &str, schema: &Schema, coercer: &Coercer) -> Result<Entity, LoadError> {
    let table = Table::parse(text)?;
    let mut values: HashMap<String, (String, u64)> = HashMap::new();
    for (key, value, line) in table.key_values()? {
        if schema.field(&key).is_none() {
            tracing::warn!(key = %key, line, "key not in schema, ignored");
            continue;
        }
        if values.contains_key(&key) {
            return Err(LoadError::DuplicateKey {
                key,
                at: Some(RowRef::Line(line)),
            });
        }
        values.insert(key, (value, line));
    }

    let mut fields: Vec<(String, Value)> = Vec::with_capacity(schema.len());
    for field in &schema.fields {
        let value = match values.get(&field.name) {
            Some((text, line)) => coercer
                .field(field, Raw::Text(text))
                .map_err(|e| e.at(RowRef::Line(*line)))?,
            None => coercer.field(field, Raw::Absent)?,
        };
        fields.push((field.name.clone(), value));
    }
    Ok(Entity::from_fields(fields))
}

pub struct Rows<'a> {
    records: StringRecordsIntoIter<&'a [u8]>,
    headers: &'a [String],
}

impl<'a> Iterator for Rows<'a> {
    type Item = Result<Row, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(malformed(&e))),
            };
            if is_blank(&record) {
                continue;
            }
            let line = record_line(&record);
            if record.len() != self.headers.len() {
                return Some(Err(LoadError::MalformedTable {
                    at: Some(RowRef::Line(line)),
                    reason: format!("expected {} columns, found {}", self.headers.len(), record.len()),
                }));
            }
            let cells = self
                .headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            return Some(Ok(Row { line, cells }));
        }
    }
}

fn builder() -> ReaderBuilder {
    let mut b = ReaderBuilder::new();
    b.has_headers(true).flexible(true);
    b
}

/// Strip a UTF-8 BOM and fold CRLF to LF.
fn normalize(text: &str) -> String {
    text.strip_prefix('\u{feff}').unwrap_or(text).replace("\r\n", "\n")
}

fn read_headers(text: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = builder().from_reader(text.as_bytes());
    let record = reader.headers().map_err(|e| malformed(&e))?;
    let at = Some(RowRef::Line(record_line(record).max(1)));
    if is_blank(record) {
        return Err(LoadError::MalformedTable {
            at: None,
            reason: "missing header".into(),
        });
    }
    let headers: Vec<String> = record.iter().map(|h| h.trim().to_string()).collect();
    for (i, h) in headers.iter().enumerate() {
        if h.is_empty() {
            return Err(LoadError::MalformedTable {
                at,
                reason: format!("header column {} has no name", i + 1),
            });
        }
        if headers[..i].contains(h) {
            return Err(LoadError::MalformedTable {
                at,
                reason: format!("duplicate header '{}'", h),
            });
        }
    }
    Ok(headers)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|cell| cell.is_empty())
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn malformed(e: &csv::Error) -> LoadError {
    LoadError::MalformedTable {
        at: e.position().map(|p| RowRef::Line(p.line())),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(table: &Table) -> Vec<Row> {
        table.rows().collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn rows_in_file_order() {
        let table = Table::parse("Name,Level\nAlpha,3\nBeta,5\n").unwrap();
        assert_eq!(table.headers(), ["Name", "Level"]);
        let rows = collect(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Name"), Some("Alpha"));
        assert_eq!(rows[1].get("Level"), Some("5"));
        assert_eq!(rows[1].line(), 3);
    }

    #[test]
    fn column_groups_become_records() {
        use crate::config::{FieldDescriptor, ScalarKind};
        let schema = Schema::new(vec![FieldDescriptor::scalar("ID", ScalarKind::Int32).required()]).with_groups(vec![
            FieldGroup::new("Goods", 2)
                .field(FieldDescriptor::scalar("Id", ScalarKind::Int32))
                .field(FieldDescriptor::scalar("Count", ScalarKind::UInt16)),
        ]);
        let text = "ID,GoodsId1,GoodsCount1,GoodsId2,GoodsCount2\n1,1001,2,,\n2,,,1002,5\n";
        let rows = decode_table(text, &schema, &Coercer::default()).unwrap();
        let goods = |i: usize| rows[i].1.get("Goods").and_then(Value::as_list).map(<[Value]>::len);
        assert_eq!(goods(0), Some(1));
        assert_eq!(goods(1), Some(1));
        let second = rows[1].1.get("Goods").and_then(Value::as_list).unwrap()[0].as_record().unwrap();
        assert_eq!(second.get_i64("Id"), Some(1002));
        assert_eq!(second.get_u64("Count"), Some(5));

        let err = decode_table("ID,GoodsId1,GoodsCount1,GoodsId2\n1,1,1,1\n", &schema, &Coercer::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedTable { at: Some(RowRef::Line(1)), .. }));
        let err = decode_table(text.replace("1002", "x").as_str(), &schema, &Coercer::default()).unwrap_err();
        assert!(matches!(err, LoadError::TypeMismatch { at: Some(RowRef::Line(3)), .. }));
    }

    #[test]
    fn rows_restart() {
        let table = Table::parse("A\n1\n2\n").unwrap();
        assert_eq!(collect(&table), collect(&table));
    }

    #[test]
    fn quoting_and_crlf() {
        let table = Table::parse("\u{feff}Name,Desc\r\n\"Smith, J\",\"say \"\"hi\"\"\r\nbye\"\r\n").unwrap();
        let rows = collect(&table);
        assert_eq!(rows[0].get("Name"), Some("Smith, J"));
        assert_eq!(rows[0].get("Desc"), Some("say \"hi\"\nbye"));
    }

    #[test]
    fn blank_rows_dropped() {
        let table = Table::parse("A,B\n1,2\n\n,\n3,4\n").unwrap();
        let rows = collect(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("A"), Some("3"));
    }

    #[test]
    fn column_count_mismatch() {
        let table = Table::parse("A,B\n1,2\n3\n").unwrap();
        let err = table.rows().collect::<Result<Vec<_>, _>>().unwrap_err();
        assert!(matches!(err, LoadError::MalformedTable { at: Some(RowRef::Line(3)), .. }));
    }

    #[test]
    fn bad_headers() {
        assert!(matches!(Table::parse(""), Err(LoadError::MalformedTable { .. })));
        assert!(matches!(Table::parse("A,,C\n"), Err(LoadError::MalformedTable { .. })));
        assert!(matches!(Table::parse("A,A\n1,2\n"), Err(LoadError::MalformedTable { .. })));
    }

    #[test]
    fn key_values_ignore_extra_columns() {
        let table = Table::parse("Key,Type,Value,Description\nFactor,float,1.5,x\nPrice,int,100,\n").unwrap();
        let kv = table.key_values().unwrap();
        assert_eq!(
            kv,
            vec![("Factor".to_string(), "1.5".to_string(), 2), ("Price".to_string(), "100".to_string(), 3)]
        );
        let missing = Table::parse("Name,Value\nx,1\n").unwrap();
        assert!(missing.key_values().is_err());
    }
}
