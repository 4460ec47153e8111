use std::collections::BTreeMap;

use crate::sink::{CellStyle, CellValue, SheetSink};

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// Inclusive rectangular range of merged cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

/// In-memory worksheet recording everything written through [`SheetSink`].
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    merged: Vec<MergedRange>,
    column_widths: BTreeMap<u32, f64>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            merged: Vec::new(),
            column_widths: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.cells.iter().map(|(&(row, col), cell)| (row, col, cell))
    }

    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    pub fn column_widths(&self) -> &BTreeMap<u32, f64> {
        &self.column_widths
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Text of a cell, or `None` for blank, numeric and missing cells
    pub fn text(&self, row: u32, col: u32) -> Option<&str> {
        self.cell(row, col).and_then(|c| c.value.as_text())
    }

    /// Number of columns holding at least one cell
    pub fn used_width(&self) -> u32 {
        self.cells.keys().map(|&(_, col)| col + 1).max().unwrap_or(0)
    }
}

impl SheetSink for Worksheet {
    fn write_cell(&mut self, row: u32, col: u32, value: CellValue, style: CellStyle) {
        self.cells.insert((row, col), Cell { value, style });
    }

    fn merge_range(
        &mut self,
        first_row: u32,
        first_col: u32,
        last_row: u32,
        last_col: u32,
        value: CellValue,
        style: CellStyle,
    ) {
        // Covered cells are written blank but styled so borders and fill span the range
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                self.write_cell(row, col, CellValue::Blank, style);
            }
        }
        self.write_cell(first_row, first_col, value, style);

        self.merged.push(MergedRange {
            first_row,
            first_col,
            last_row,
            last_col,
        });
    }

    fn set_column_width(&mut self, first_col: u32, last_col: u32, width: f64) {
        for col in first_col..=last_col {
            self.column_widths.insert(col, width);
        }
    }
}
