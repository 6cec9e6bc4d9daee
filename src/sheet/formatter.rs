use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::config::ExportConfig;
use crate::models::{CellStyle, CellValue, Column, ColumnKind, FormatSpec, Row};
use crate::source::ValueSource;

/// Resolves raw cell values and turns them into display text, spreadsheet
/// number-format codes, and merged cell styles.
pub struct CellFormatter {
    enable_formatter: bool,
    strip_html: bool,
    currency_symbol: String,
    tag_pattern: Regex,
}

impl CellFormatter {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            enable_formatter: config.enable_formatter,
            strip_html: config.strip_html,
            currency_symbol: config.currency_symbol.clone(),
            // Matches tags only; entity decoding is a separate pass.
            tag_pattern: Regex::new(r"<[^>]*>").unwrap(),
        }
    }

    /// Raw value for one cell. Precedence: serial columns count rows and
    /// ignore resolvers; then the explicit content resolver; then the
    /// attribute path with an empty-string default; otherwise null.
    pub fn resolve_value(&self, source: ValueSource, column: &Column, row: &Row) -> CellValue {
        match column.kind {
            ColumnKind::Serial => CellValue::Int(row.index as i64 + 1),
            ColumnKind::Action => CellValue::Null,
            ColumnKind::Data => {
                if let Some(resolver) = &column.content {
                    resolver.resolve(&row.model, &row.key, row.index)
                } else if let Some(attribute) = &column.attribute {
                    source.attribute(&row.model, attribute)
                } else {
                    CellValue::Null
                }
            }
        }
    }

    /// Display text for a value. Empty/absent values render as an empty
    /// string, never as null. An unrecognized format kind silently falls
    /// back to raw passthrough.
    pub fn display(&self, value: &CellValue, format: Option<&FormatSpec>) -> String {
        let raw = value.to_string();
        if raw.is_empty() {
            return String::new();
        }

        let text = match format {
            Some(spec) if self.enable_formatter => self.apply_format(value, &raw, spec),
            _ => raw,
        };

        if self.strip_html {
            self.strip_markup(&text)
        } else {
            text
        }
    }

    fn apply_format(&self, value: &CellValue, raw: &str, spec: &FormatSpec) -> String {
        match spec.kind.as_str() {
            "currency" => match value.as_f64() {
                Some(v) => {
                    let decimals = spec.decimals.unwrap_or(2) as usize;
                    format!(
                        "{}{}",
                        self.currency_symbol,
                        group_thousands(v, decimals)
                    )
                }
                None => raw.to_string(),
            },
            "percent" => match value.as_f64() {
                Some(v) => {
                    let decimals = spec.decimals.unwrap_or(0) as usize;
                    format!("{:.*}%", decimals, v * 100.0)
                }
                None => raw.to_string(),
            },
            "integer" => match value.as_f64() {
                Some(v) => format!("{}", v.trunc() as i64),
                None => raw.to_string(),
            },
            "decimal" => match value.as_f64() {
                Some(v) => format!("{:.*}", spec.decimals.unwrap_or(2) as usize, v),
                None => raw.to_string(),
            },
            "date" => self.format_date(value, raw, spec),
            _ => raw.to_string(),
        }
    }

    fn format_date(&self, value: &CellValue, raw: &str, spec: &FormatSpec) -> String {
        let out = spec.date_out.as_deref().unwrap_or("%Y-%m-%d");
        if let CellValue::Date(dt) = value {
            return dt.format(out).to_string();
        }
        let parsed = spec
            .date_in
            .as_deref()
            .and_then(|pattern| {
                NaiveDateTime::parse_from_str(raw, pattern)
                    .ok()
                    .or_else(|| {
                        NaiveDate::parse_from_str(raw, pattern)
                            .ok()
                            .and_then(|d| d.and_hms_opt(0, 0, 0))
                    })
            });
        match parsed {
            Some(dt) => dt.format(out).to_string(),
            None => raw.to_string(),
        }
    }

    /// Spreadsheet number-format code for numeric format kinds; `None` for
    /// text-like kinds so writers fall back to plain strings.
    pub fn number_format(&self, format: Option<&FormatSpec>) -> Option<String> {
        let spec = format?;
        if !self.enable_formatter {
            return None;
        }
        match spec.kind.as_str() {
            "currency" => {
                let decimals = spec.decimals.unwrap_or(2);
                Some(format!(
                    "{}#,##0{}",
                    self.currency_symbol,
                    decimal_suffix(decimals)
                ))
            }
            "percent" => Some(format!("0{}%", decimal_suffix(spec.decimals.unwrap_or(0)))),
            "integer" => Some("#,##0".to_string()),
            "decimal" => Some(format!("0{}", decimal_suffix(spec.decimals.unwrap_or(2)))),
            _ => None,
        }
    }

    /// Effective style for one cell: the region base (format template merged
    /// with caller options upstream), then column settings filling remaining
    /// gaps, then the derived number-format code if still unset.
    pub fn style_for(&self, column: &Column, base: &CellStyle) -> CellStyle {
        let mut style = base.clone();
        if let Some(column_style) = &column.style {
            style.merge_missing(column_style);
        }
        if style.num_format.is_none() {
            style.num_format = self.number_format(column.format.as_ref());
        }
        style
    }

    /// Remove markup tags and decode the common HTML entities.
    pub fn strip_markup(&self, text: &str) -> String {
        if !text.contains('<') && !text.contains('&') {
            return text.to_string();
        }
        let stripped = self.tag_pattern.replace_all(text, "");
        decode_entities(&stripped)
    }
}

fn decimal_suffix(decimals: u32) -> String {
    if decimals == 0 {
        String::new()
    } else {
        format!(".{}", "0".repeat(decimals as usize))
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::new();
    for (pos, ch) in int_part.chars().enumerate() {
        if pos > 0 && (int_part.len() - pos) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
