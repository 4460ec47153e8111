/// Visual style of a cell. Each maps to one workbook cell format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    /// Bold, grey fill, bordered, centered
    Header,
    /// Bold, green fill, bordered, centered and wrapped
    TotalsHeader,
    /// Bordered and centered
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Text when present and non-empty, otherwise a blank cell
    pub fn optional_text<T: ToString>(value: Option<&T>) -> Self {
        match value.map(ToString::to_string) {
            Some(text) if !text.is_empty() => Self::Text(text),
            _ => Self::Blank,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Destination for a laid-out sheet.
pub trait SheetSink {
    fn write_cell(&mut self, row: u32, col: u32, value: CellValue, style: CellStyle);

    /// Merge an inclusive range and write `value` into its top-left cell.
    fn merge_range(
        &mut self,
        first_row: u32,
        first_col: u32,
        last_row: u32,
        last_col: u32,
        value: CellValue,
        style: CellStyle,
    );

    /// Set the width of every column in the inclusive range.
    fn set_column_width(&mut self, first_col: u32, last_col: u32, width: f64);
}
