//! Single-sheet Office Open XML workbook writer.
//!
//! Only the parts a spreadsheet application needs are emitted: content types,
//! package relationships, the workbook, one worksheet and a fixed stylesheet.
//! Strings are written inline so no shared strings part is required.

use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{LayoutError, Result};
use crate::sink::{CellStyle, CellValue};
use crate::worksheet::{MergedRange, Worksheet};

/// MIME type of `.xlsx` files
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// cellXfs order must match `style_index`
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font><font><b/><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts><fills count="4"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFF2F2F2"/><bgColor indexed="64"/></patternFill></fill><fill><patternFill patternType="solid"><fgColor rgb="FFD9EAD3"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"><color indexed="64"/></left><right style="thin"><color indexed="64"/></right><top style="thin"><color indexed="64"/></top><bottom style="thin"><color indexed="64"/></bottom><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf><xf numFmtId="0" fontId="1" fillId="3" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Serialize a worksheet as a complete `.xlsx` package.
pub fn write_workbook(sheet: &Worksheet) -> Result<Vec<u8>> {
    validate_sheet_name(sheet.name())?;

    let workbook = workbook_xml(sheet.name())?;
    let worksheet = worksheet_xml(sheet)?;

    let parts: [(&str, &str); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", &worksheet),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (path, content) in parts {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(path, options)?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.chars().count() > 31
        || name.contains(['[', ']', ':', '*', '?', '/', '\\'])
        || name.starts_with('\'')
        || name.ends_with('\'');

    if invalid {
        return Err(LayoutError::SheetName(name.to_string()));
    }
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> Result<String> {
    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    write!(
        xml,
        r#"<workbook xmlns="{}" xmlns:r="{}"><bookViews><workbookView/></bookViews><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        MAIN_NS,
        REL_NS,
        escape_xml(sheet_name)
    )?;
    Ok(xml)
}

fn worksheet_xml(sheet: &Worksheet) -> Result<String> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    write!(xml, r#"<worksheet xmlns="{}" xmlns:r="{}">"#, MAIN_NS, REL_NS)?;

    if let Some(dimension) = dimension(sheet) {
        write!(xml, r#"<dimension ref="{}"/>"#, dimension)?;
    }
    xml.push_str(r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews>"#);
    xml.push_str(r#"<sheetFormatPr defaultRowHeight="15"/>"#);

    write_cols(&mut xml, sheet)?;

    xml.push_str("<sheetData>");
    write_sheet_data(&mut xml, sheet)?;
    xml.push_str("</sheetData>");

    write_merged_cells(&mut xml, sheet.merged_ranges())?;

    xml.push_str(
        r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
    );
    xml.push_str("</worksheet>");

    Ok(xml)
}

fn dimension(sheet: &Worksheet) -> Option<String> {
    let last_row = sheet.cells().map(|(row, _, _)| row).max()?;
    let last_col = sheet.used_width().checked_sub(1)?;
    Some(format!("A1:{}", cell_ref(last_row, last_col)))
}

/// Consecutive columns sharing a width collapse into one `<col>` entry.
fn write_cols(xml: &mut String, sheet: &Worksheet) -> Result<()> {
    let mut spans: Vec<(u32, u32, f64)> = Vec::new();
    for (&col, &width) in sheet.column_widths() {
        if let Some((_, last, w)) = spans.last_mut() {
            if *last + 1 == col && *w == width {
                *last = col;
                continue;
            }
        }
        spans.push((col, col, width));
    }

    if spans.is_empty() {
        return Ok(());
    }

    xml.push_str("<cols>");
    for (first, last, width) in spans {
        // NOTE: column numbering in <col> is 1-based
        write!(
            xml,
            r#"<col min="{}" max="{}" width="{}" customWidth="1"/>"#,
            first + 1,
            last + 1,
            width
        )?;
    }
    xml.push_str("</cols>");
    Ok(())
}

fn write_sheet_data(xml: &mut String, sheet: &Worksheet) -> Result<()> {
    let mut current_row: Option<u32> = None;

    for (row, col, cell) in sheet.cells() {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            write!(xml, r#"<row r="{}">"#, row + 1)?;
            current_row = Some(row);
        }

        let reference = cell_ref(row, col);
        let style = style_index(cell.style);

        match &cell.value {
            CellValue::Text(text) => {
                let space = if text.trim() != text {
                    r#" xml:space="preserve""#
                } else {
                    ""
                };
                write!(
                    xml,
                    r#"<c r="{}" s="{}" t="inlineStr"><is><t{}>{}</t></is></c>"#,
                    reference,
                    style,
                    space,
                    escape_xml(text)
                )?;
            }
            CellValue::Number(n) if n.is_finite() => {
                write!(xml, r#"<c r="{}" s="{}"><v>{}</v></c>"#, reference, style, n)?;
            }
            CellValue::Number(_) | CellValue::Blank => {
                write!(xml, r#"<c r="{}" s="{}"/>"#, reference, style)?;
            }
        }
    }

    if current_row.is_some() {
        xml.push_str("</row>");
    }
    Ok(())
}

fn write_merged_cells(xml: &mut String, merged: &[MergedRange]) -> Result<()> {
    if merged.is_empty() {
        return Ok(());
    }

    write!(xml, r#"<mergeCells count="{}">"#, merged.len())?;
    for range in merged {
        write!(
            xml,
            r#"<mergeCell ref="{}:{}"/>"#,
            cell_ref(range.first_row, range.first_col),
            cell_ref(range.last_row, range.last_col)
        )?;
    }
    xml.push_str("</mergeCells>");
    Ok(())
}

fn style_index(style: CellStyle) -> usize {
    match style {
        CellStyle::Header => 1,
        CellStyle::TotalsHeader => 2,
        CellStyle::Body => 3,
    }
}

/// Zero-based column index to spreadsheet letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Zero-based coordinates to an A1 reference.
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}
