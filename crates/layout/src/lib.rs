pub mod error;
pub mod generator;
pub mod sink;
pub mod worksheet;
pub mod xlsx;

pub use error::LayoutError;
pub use generator::{plan, render, Block, BlockKind, LayoutPlan, SHEET_NAME};
pub use sink::{CellStyle, CellValue, SheetSink};
pub use worksheet::Worksheet;
pub use xlsx::{write_workbook, XLSX_MIME};

use extract::ExtractionResult;

/// Lay out an extraction result and serialize it as an `.xlsx` workbook.
pub fn build_workbook(result: &ExtractionResult) -> Result<(Vec<u8>, LayoutPlan), LayoutError> {
    let mut sheet = Worksheet::new(SHEET_NAME);
    let plan = render(result, &mut sheet);
    let bytes = write_workbook(&sheet)?;
    Ok((bytes, plan))
}
