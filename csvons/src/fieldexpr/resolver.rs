//! Resolving a field expression against a record matrix.
//!
//! Resolution is lazy: [`FieldResolver::values`] locates the referenced
//! columns up front, then [`FieldValues`] walks the data rows one at a time
//! and yields the values each row contributes. A sequence is single-pass;
//! call `values` again for a fresh one.

use std::borrow::Cow;
use std::iter::{Enumerate, Skip};
use std::slice;

use super::FieldExpr;
use crate::error::{ConfigError, ConfigResult};
use crate::models::{Metadata, RecordMatrix};

/// A field expression bound to the metadata that decodes it.
#[derive(Debug, Clone)]
pub struct FieldResolver<'m> {
    metadata: &'m Metadata,
    text: String,
    expr: FieldExpr,
}

/// One resolved value and the matrix row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue<'a> {
    pub row: usize,
    pub value: Cow<'a, str>,
}

impl<'m> FieldResolver<'m> {
    pub fn new(metadata: &'m Metadata, expr: &str) -> ConfigResult<Self> {
        Ok(Self {
            metadata,
            text: expr.to_string(),
            expr: FieldExpr::parse(expr)?,
        })
    }

    pub fn expr(&self) -> &FieldExpr {
        &self.expr
    }

    /// The expression as written in the rule.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Start a value sequence over the data rows of `matrix`.
    ///
    /// Fails when the header row is missing or a referenced column is not in
    /// it. `stem` only feeds error messages.
    pub fn values<'a>(
        &'a self,
        stem: &str,
        matrix: &'a RecordMatrix,
    ) -> ConfigResult<FieldValues<'a>> {
        let name_index = self.metadata.name_index;
        let header = matrix
            .header(name_index)
            .ok_or_else(|| ConfigError::MissingHeader {
                stem: stem.to_string(),
                name_index,
                rows: matrix.len(),
            })?;

        let mut positions = Vec::new();
        for column in self.expr.columns() {
            match header.iter().position(|name| name == column) {
                Some(pos) => positions.push(pos),
                None => {
                    tracing::error!(stem, field = %self.text, column, "column not found in header");
                    return Err(ConfigError::MissingColumn {
                        stem: stem.to_string(),
                        expr: self.text.clone(),
                        column: column.to_string(),
                    });
                }
            }
        }

        Ok(FieldValues {
            metadata: self.metadata,
            text: &self.text,
            expr: &self.expr,
            positions,
            rows: matrix.rows().iter().enumerate().skip(self.metadata.data_index),
            pending: Vec::new().into_iter(),
        })
    }
}

/// Lazy, single-pass sequence of the values of one field.
pub struct FieldValues<'a> {
    metadata: &'a Metadata,
    text: &'a str,
    expr: &'a FieldExpr,
    positions: Vec<usize>,
    rows: Skip<Enumerate<slice::Iter<'a, Vec<String>>>>,
    pending: std::vec::IntoIter<FieldValue<'a>>,
}

impl<'a> FieldValues<'a> {
    /// Cell at the first referenced column, `None` when the row is too short.
    fn cell(&self, row: usize, cells: &'a [String]) -> Option<&'a str> {
        let cell = cells.get(self.positions[0]).map(String::as_str);
        if cell.is_none() {
            tracing::debug!(field = %self.text, row, "row too short, skipped");
        }
        cell
    }

    /// Complex value: every referenced cell followed by the connector.
    fn join(&self, row: usize, cells: &'a [String]) -> Option<String> {
        let connector = self.metadata.field_connector.as_str();
        let mut joined = String::new();
        for &pos in &self.positions {
            let Some(cell) = cells.get(pos) else {
                tracing::debug!(field = %self.text, row, "row too short, skipped");
                return None;
            };
            joined.push_str(cell);
            joined.push_str(connector);
        }
        Some(joined)
    }

    /// Values contributed by one data row.
    fn expand_row(&self, row: usize, cells: &'a [String]) -> Vec<FieldValue<'a>> {
        let lev1 = self.metadata.lev1_separator.as_str();
        let lev2 = self.metadata.lev2_separator.as_str();
        let borrowed = |value: &'a str| FieldValue {
            row,
            value: Cow::Borrowed(value),
        };

        match self.expr {
            FieldExpr::Plain { .. } => self.cell(row, cells).map(borrowed).into_iter().collect(),
            FieldExpr::Repeat { .. } => match self.cell(row, cells) {
                Some(cell) => cell.split(lev1).map(borrowed).collect(),
                None => Vec::new(),
            },
            FieldExpr::Nested { index, .. } => match self.cell(row, cells) {
                Some(cell) => cell
                    .split(lev1)
                    .filter_map(|part| {
                        let element = part.split(lev2).nth(*index);
                        if element.is_none() {
                            tracing::debug!(
                                field = %self.text,
                                row,
                                part,
                                "nested part has no element at index, skipped"
                            );
                        }
                        element.map(borrowed)
                    })
                    .collect(),
                None => Vec::new(),
            },
            FieldExpr::Complex { .. } => self
                .join(row, cells)
                .map(|joined| FieldValue {
                    row,
                    value: Cow::Owned(joined),
                })
                .into_iter()
                .collect(),
        }
    }
}

impl<'a> Iterator for FieldValues<'a> {
    type Item = FieldValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.pending.next() {
                return Some(value);
            }
            let (row, cells) = self.rows.next()?;
            self.pending = self.expand_row(row, cells).into_iter();
        }
    }
}

impl std::iter::FusedIterator for FieldValues<'_> {}
