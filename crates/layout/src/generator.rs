//! Horizontal block layout of a shareholder structure.
//!
//! Blocks are tiled left to right over three rows: a merged title, a row of
//! column labels and a row of values.
//!
//! ```text
//! | ACCIONISTA 1 (6 cols) | TOTALES (2 cols) | ACCIONISTA 2 (6 cols) | ACCIONISTA 3 ...
//! ```
//!
//! TOTALES always follows the first shareholder, or starts the sheet when
//! there are no shareholders at all.

use extract::{ExtractionResult, ShareholderRecord, TotalsSummary};
use serde_json::Number;
use tracing::debug;

use crate::sink::{CellStyle, CellValue, SheetSink};

pub const SHEET_NAME: &str = "Accionariado";

pub const SHAREHOLDER_HEADERS: [&str; 6] = ["NIF", "RAZON SOCIAL", "%", "PAIS", "NATURALEZA", "PYME"];

pub const TOTALS_TITLE: &str = "TOTALES";

pub const TOTALS_LABELS: [&str; 2] = ["TOTAL PARTICIPACIÓN PÚBLICA", "TOTAL PARTICIPACIÓN PRIVADA"];

pub const COLUMN_WIDTH: f64 = 15.0;

const SHAREHOLDER_SPAN: u32 = SHAREHOLDER_HEADERS.len() as u32;
const TOTALS_SPAN: u32 = TOTALS_LABELS.len() as u32;

const TITLE_ROW: u32 = 0;
const LABEL_ROW: u32 = 1;
const VALUE_ROW: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// 1-based position of the shareholder in the extracted list
    Shareholder(usize),
    Totals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub first_col: u32,
    pub last_col: u32,
}

impl Block {
    pub fn width(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    pub fn title(&self) -> String {
        match self.kind {
            BlockKind::Shareholder(index) => format!("ACCIONISTA {}", index),
            BlockKind::Totals => TOTALS_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub blocks: Vec<Block>,
    /// Columns covered by all blocks
    pub width: u32,
}

impl LayoutPlan {
    pub fn totals_block(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == BlockKind::Totals)
    }

    pub fn shareholder_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Shareholder(_)))
    }
}

/// Column positions of every block for `shareholders` records.
pub fn plan(shareholders: usize) -> LayoutPlan {
    let mut blocks = Vec::with_capacity(shareholders + 1);
    let mut cursor = 0;

    let mut push = |kind: BlockKind, span: u32| {
        blocks.push(Block {
            kind,
            first_col: cursor,
            last_col: cursor + span - 1,
        });
        cursor += span;
    };

    if shareholders > 0 {
        push(BlockKind::Shareholder(1), SHAREHOLDER_SPAN);
    }
    push(BlockKind::Totals, TOTALS_SPAN);
    for index in 2..=shareholders {
        push(BlockKind::Shareholder(index), SHAREHOLDER_SPAN);
    }

    LayoutPlan {
        blocks,
        width: cursor,
    }
}

/// Write the full layout of `result` into `sink`.
pub fn render<S: SheetSink>(result: &ExtractionResult, sink: &mut S) -> LayoutPlan {
    let plan = plan(result.shareholders.len());

    for block in &plan.blocks {
        match block.kind {
            BlockKind::Shareholder(index) => {
                write_shareholder(sink, block, &result.shareholders[index - 1])
            }
            BlockKind::Totals => write_totals(sink, block, &result.totals),
        }
    }

    // Inclusive of the column after the last block
    sink.set_column_width(0, plan.width, COLUMN_WIDTH);

    debug!(blocks = plan.blocks.len(), width = plan.width, "Rendered layout");
    plan
}

/// Render a total as shown in the sheet, e.g. `0` as "0%" and `12.5` as "12.5%".
pub fn format_percent(value: &Number) -> String {
    format!("{}%", value)
}

fn write_title<S: SheetSink>(sink: &mut S, block: &Block, style: CellStyle) {
    sink.merge_range(
        TITLE_ROW,
        block.first_col,
        TITLE_ROW,
        block.last_col,
        CellValue::Text(block.title()),
        style,
    );
}

fn write_shareholder<S: SheetSink>(sink: &mut S, block: &Block, record: &ShareholderRecord) {
    write_title(sink, block, CellStyle::Header);

    for (offset, label) in (0u32..).zip(SHAREHOLDER_HEADERS) {
        sink.write_cell(
            LABEL_ROW,
            block.first_col + offset,
            CellValue::text(label),
            CellStyle::Header,
        );
    }

    let percentage = record
        .percentage
        .as_ref()
        .and_then(Number::as_f64)
        .map_or(CellValue::Blank, CellValue::Number);

    let values = [
        CellValue::optional_text(record.tax_id.as_ref()),
        CellValue::optional_text(record.legal_name.as_ref()),
        percentage,
        CellValue::optional_text(record.country.as_ref()),
        CellValue::optional_text(record.nature.as_ref()),
        CellValue::optional_text(record.sme.as_ref()),
    ];

    for (offset, value) in (0u32..).zip(values) {
        sink.write_cell(VALUE_ROW, block.first_col + offset, value, CellStyle::Body);
    }
}

fn write_totals<S: SheetSink>(sink: &mut S, block: &Block, totals: &TotalsSummary) {
    write_title(sink, block, CellStyle::TotalsHeader);

    for (offset, label) in (0u32..).zip(TOTALS_LABELS) {
        sink.write_cell(
            LABEL_ROW,
            block.first_col + offset,
            CellValue::text(label),
            CellStyle::TotalsHeader,
        );
    }

    let values = [&totals.public_share, &totals.private_share];
    for (offset, value) in (0u32..).zip(values) {
        let cell = value
            .as_ref()
            .map_or(CellValue::Blank, |n| CellValue::Text(format_percent(n)));
        sink.write_cell(VALUE_ROW, block.first_col + offset, cell, CellStyle::Body);
    }
}
