use std::io::Write;

use super::SheetWriter;
use crate::error::Result;
use crate::models::{CellStyle, HorizontalAlign, VerticalAlign};
use crate::sheet::Sheet;

/// HTML table serializer. Also the input stage of the PDF path, which renders
/// this writer's markup through an external backend.
pub struct HtmlWriter {
    encoding: String,
}

impl HtmlWriter {
    pub fn new(encoding: &str) -> Self {
        Self {
            encoding: encoding.to_string(),
        }
    }

    /// Render the sheet into a full HTML document string.
    pub fn render(&self, sheet: &Sheet) -> String {
        let (max_row, max_col) = sheet.dimensions();
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str(&format!(
            "<meta charset=\"{}\">\n<title>{}</title>\n",
            escape_html(&self.encoding),
            escape_html(sheet.name())
        ));
        html.push_str(
            "<style>table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px}</style>\n",
        );
        html.push_str("</head>\n<body>\n<table>\n");

        let header_rows = sheet.frozen_rows().unwrap_or(0);
        for row in 1..=max_row {
            html.push_str("<tr>");
            let tag = if row <= header_rows { "th" } else { "td" };
            for col in 0..=max_col {
                let merge = sheet
                    .merges()
                    .iter()
                    .find(|m| m.contains(col, row))
                    .copied();
                if let Some(m) = merge {
                    if m.first_col != col || m.first_row != row {
                        // Covered by a merged region; the top-left cell
                        // already spans this slot.
                        continue;
                    }
                }

                let mut attrs = String::new();
                if let Some(m) = merge {
                    let colspan = m.last_col - m.first_col + 1;
                    let rowspan = m.last_row - m.first_row + 1;
                    if colspan > 1 {
                        attrs.push_str(&format!(" colspan=\"{colspan}\""));
                    }
                    if rowspan > 1 {
                        attrs.push_str(&format!(" rowspan=\"{rowspan}\""));
                    }
                }
                let (display, style) = match sheet.cell(col, row) {
                    Some(cell) => (cell.display.as_str(), inline_style(&cell.style)),
                    None => ("", String::new()),
                };
                if !style.is_empty() {
                    attrs.push_str(&format!(" style=\"{style}\""));
                }

                html.push_str(&format!("<{tag}{attrs}>{}</{tag}>", escape_html(display)));
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n</body>\n</html>\n");
        html
    }
}

impl SheetWriter for HtmlWriter {
    fn write(&self, sheet: &Sheet, out: &mut dyn Write) -> Result<()> {
        out.write_all(self.render(sheet).as_bytes())?;
        Ok(())
    }
}

fn inline_style(style: &CellStyle) -> String {
    let mut css = Vec::new();
    if style.bold.unwrap_or(false) {
        css.push("font-weight:bold".to_string());
    }
    if style.italic.unwrap_or(false) {
        css.push("font-style:italic".to_string());
    }
    if let Some(align) = style.align {
        let value = match align {
            HorizontalAlign::Left => "left",
            HorizontalAlign::Center => "center",
            HorizontalAlign::Right => "right",
            HorizontalAlign::Justify => "justify",
        };
        css.push(format!("text-align:{value}"));
    }
    if let Some(valign) = style.valign {
        let value = match valign {
            VerticalAlign::Top => "top",
            VerticalAlign::Middle => "middle",
            VerticalAlign::Bottom => "bottom",
        };
        css.push(format!("vertical-align:{value}"));
    }
    if let Some(color) = &style.font_color {
        css.push(format!("color:{color}"));
    }
    if let Some(color) = &style.fill_color {
        css.push(format!("background-color:{color}"));
    }
    css.join(";")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
