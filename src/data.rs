use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VizError};

/// Column name that yields a constant `"1"` per row, for unweighted counts.
pub const COUNT_COLUMN: &str = ".COUNT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub head: Head,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Head {
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub cells: Vec<String>,
}

impl Table {
    pub fn new(id: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            id: id.into(),
            head: Head { cells: headers },
            body: Body { rows },
        }
    }

    pub fn row_count(&self) -> usize {
        self.body.rows.len()
    }

    pub fn row_ids(&self) -> impl Iterator<Item = &str> {
        self.body.rows.iter().map(|row| row.id.as_str())
    }

    /// Values of the named column, one per row.
    ///
    /// A row that is shorter than the header yields `None` for the column.
    /// [`COUNT_COLUMN`] is synthesized; any other unknown name fails.
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        if name == COUNT_COLUMN {
            return Ok(vec![Some("1"); self.row_count()]);
        }
        let idx = self
            .head
            .cells
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| VizError::ColumnNotFound {
                table_id: self.id.clone(),
                column: name.to_string(),
            })?;

        Ok(self
            .body
            .rows
            .iter()
            .map(|row| row.cells.get(idx).map(String::as_str))
            .collect())
    }

    /// Build a table from CSV text. Row ids are the zero-based record index.
    pub fn from_csv<R: Read>(id: impl Into<String>, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| VizError::InvalidRequest(format!("failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| VizError::InvalidRequest(format!("failed to read CSV record {}: {}", i, e)))?;
            rows.push(Row {
                id: i.to_string(),
                cells: record.iter().map(|c| c.to_string()).collect(),
            });
        }

        Ok(Self::new(id, headers, rows))
    }

    /// Build a table from a JSON array of objects.
    ///
    /// The keys of the first object become the header. Row ids are the
    /// zero-based array index.
    pub fn from_records(id: impl Into<String>, value: &Value) -> Result<Self> {
        let array = value.as_array().ok_or_else(|| {
            VizError::InvalidRequest("input data must be a JSON array of objects".to_string())
        })?;

        let headers: Vec<String> = match array.first() {
            Some(first) => first
                .as_object()
                .ok_or_else(|| VizError::InvalidRequest("items in array must be objects".to_string()))?
                .keys()
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let mut rows = Vec::with_capacity(array.len());
        for (i, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| VizError::InvalidRequest("items in array must be objects".to_string()))?;

            let mut cells = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => {
                        return Err(VizError::InvalidRequest(format!(
                            "unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                cells.push(cell);
            }
            rows.push(Row { id: i.to_string(), cells });
        }

        Ok(Self::new(id, headers, rows))
    }
}
