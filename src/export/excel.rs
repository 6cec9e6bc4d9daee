use std::io::Write;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};

use super::SheetWriter;
use crate::error::Result;
use crate::models::{BorderStyle, CellStyle, CellValue, HorizontalAlign, VerticalAlign};
use crate::sheet::Sheet;

/// Spreadsheet serializer backed by `rust_xlsxwriter`. Serves both the
/// modern and the legacy spreadsheet format slots; the payload is always
/// OOXML (see DESIGN.md).
pub struct ExcelWriter;

impl ExcelWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExcelWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetWriter for ExcelWriter {
    fn write(&self, sheet: &Sheet, out: &mut dyn Write) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name())?;

        // Merged regions carry their top-left cell's content; the covered
        // cells are skipped in the main pass below.
        for merge in sheet.merges() {
            let (display, style) = match sheet.cell(merge.first_col, merge.first_row) {
                Some(cell) => (cell.display.as_str(), cell_format(&cell.style)),
                None => ("", Format::new()),
            };
            worksheet.merge_range(
                merge.first_row - 1,
                merge.first_col,
                merge.last_row - 1,
                merge.last_col,
                display,
                &style,
            )?;
        }

        let (max_row, max_col) = sheet.dimensions();
        for row in 1..=max_row {
            for col in 0..=max_col {
                if sheet.merges().iter().any(|m| m.contains(col, row)) {
                    continue;
                }
                let Some(cell) = sheet.cell(col, row) else {
                    continue;
                };
                let format = cell_format(&cell.style);
                let (r, c) = (row - 1, col);
                match &cell.value {
                    CellValue::Null => worksheet.write_blank(r, c, &format)?,
                    CellValue::Int(i) => {
                        worksheet.write_number_with_format(r, c, *i as f64, &format)?
                    }
                    CellValue::Float(v) => worksheet.write_number_with_format(r, c, *v, &format)?,
                    CellValue::Bool(b) => worksheet.write_boolean_with_format(r, c, *b, &format)?,
                    CellValue::Formula(f) => {
                        worksheet.write_formula_with_format(r, c, f.as_str(), &format)?
                    }
                    CellValue::Text(_) | CellValue::Date(_) => {
                        worksheet.write_string_with_format(r, c, &cell.display, &format)?
                    }
                };
            }
        }

        if let Some(frozen) = sheet.frozen_rows() {
            worksheet.set_freeze_panes(frozen, 0)?;
        }
        if let Some(filter) = sheet.autofilter() {
            worksheet.autofilter(
                filter.first_row - 1,
                filter.first_col,
                filter.last_row - 1,
                filter.last_col,
            )?;
        }
        worksheet.autofit();

        let buffer = workbook.save_to_buffer()?;
        out.write_all(&buffer)?;
        Ok(())
    }
}

fn cell_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    if style.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if style.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = &style.font_color {
        format = format.set_font_color(color.as_str());
    }
    if let Some(color) = &style.fill_color {
        format = format.set_background_color(color.as_str());
    }
    if let Some(align) = style.align {
        format = format.set_align(match align {
            HorizontalAlign::Left => FormatAlign::Left,
            HorizontalAlign::Center => FormatAlign::Center,
            HorizontalAlign::Right => FormatAlign::Right,
            HorizontalAlign::Justify => FormatAlign::Justify,
        });
    }
    if let Some(valign) = style.valign {
        format = format.set_align(match valign {
            VerticalAlign::Top => FormatAlign::Top,
            VerticalAlign::Middle => FormatAlign::VerticalCenter,
            VerticalAlign::Bottom => FormatAlign::Bottom,
        });
    }
    if let Some(code) = &style.num_format {
        format = format.set_num_format(code.as_str());
    }
    if let Some(border) = style.border {
        format = format.set_border(match border {
            BorderStyle::Thin => FormatBorder::Thin,
            BorderStyle::Medium => FormatBorder::Medium,
            BorderStyle::Thick => FormatBorder::Thick,
            BorderStyle::Double => FormatBorder::Double,
            BorderStyle::Dashed => FormatBorder::Dashed,
            BorderStyle::Dotted => FormatBorder::Dotted,
            BorderStyle::Hair => FormatBorder::Hair,
        });
    }
    if style.wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}
