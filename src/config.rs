use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::models::{CellStyle, RegionStyles};

/// Output format selected for one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExportFormat {
    Html,
    Csv,
    Txt,
    Pdf,
    Xls,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Html,
        ExportFormat::Csv,
        ExportFormat::Txt,
        ExportFormat::Pdf,
        ExportFormat::Xls,
        ExportFormat::Xlsx,
    ];
}

/// Serializer family a format is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    Spreadsheet,
    Delimited,
    Html,
    Pdf,
}

/// External renderer used for PDF output. The HTML writer's markup is piped
/// through this binary; there is no native PDF serializer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Path to the HTML-to-PDF backend binary (e.g. wkhtmltopdf).
    pub backend: PathBuf,
    /// Extra arguments inserted before the input/output paths.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Per-format export configuration: presentation metadata plus the writer
/// binding. A format without a binding cannot be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    pub label: String,
    pub icon: String,
    pub mime: String,
    pub extension: String,
    pub writer: Option<WriterKind>,
    /// Field delimiter for delimited writers.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Force a UTF-8 byte-order mark so spreadsheet applications detect the
    /// encoding.
    #[serde(default)]
    pub bom: bool,
}

impl FormatConfig {
    fn defaults() -> BTreeMap<ExportFormat, FormatConfig> {
        let mut formats = BTreeMap::new();
        formats.insert(
            ExportFormat::Html,
            FormatConfig {
                label: "HTML".to_string(),
                icon: "file-code".to_string(),
                mime: "text/html".to_string(),
                extension: "html".to_string(),
                writer: Some(WriterKind::Html),
                delimiter: None,
                bom: false,
            },
        );
        formats.insert(
            ExportFormat::Csv,
            FormatConfig {
                label: "CSV".to_string(),
                icon: "file-delimited".to_string(),
                mime: "text/csv".to_string(),
                extension: "csv".to_string(),
                writer: Some(WriterKind::Delimited),
                delimiter: Some(','),
                bom: true,
            },
        );
        formats.insert(
            ExportFormat::Txt,
            FormatConfig {
                label: "Text".to_string(),
                icon: "file-text".to_string(),
                mime: "text/plain".to_string(),
                extension: "txt".to_string(),
                writer: Some(WriterKind::Delimited),
                delimiter: Some('\t'),
                bom: true,
            },
        );
        formats.insert(
            ExportFormat::Pdf,
            FormatConfig {
                label: "PDF".to_string(),
                icon: "file-pdf".to_string(),
                mime: "application/pdf".to_string(),
                extension: "pdf".to_string(),
                writer: Some(WriterKind::Pdf),
                delimiter: None,
                bom: false,
            },
        );
        formats.insert(
            ExportFormat::Xls,
            FormatConfig {
                label: "Excel 97-2003".to_string(),
                icon: "file-excel".to_string(),
                mime: "application/vnd.ms-excel".to_string(),
                extension: "xls".to_string(),
                writer: Some(WriterKind::Spreadsheet),
                delimiter: None,
                bom: false,
            },
        );
        formats.insert(
            ExportFormat::Xlsx,
            FormatConfig {
                label: "Excel".to_string(),
                icon: "file-excel".to_string(),
                mime: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                    .to_string(),
                extension: "xlsx".to_string(),
                writer: Some(WriterKind::Spreadsheet),
                delimiter: None,
                bom: false,
            },
        );
        formats
    }
}

/// One row of static content placed above the header or below the footer,
/// merged across the full sheet width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub value: String,
    #[serde(default)]
    pub style: CellStyle,
}

impl ContentBlock {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            style: CellStyle::default(),
        }
    }

    pub fn styled(value: &str, style: CellStyle) -> Self {
        Self {
            value: value.to_string(),
            style,
        }
    }
}

/// Full configuration for one export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output file name without extension.
    pub filename: String,
    /// Folder the artifact (and streaming temp file) is written under.
    pub export_folder: PathBuf,
    /// Stream bytes back instead of leaving a saved file behind.
    pub stream: bool,
    /// Remove the saved artifact once it has been handed to the caller.
    pub delete_after_serve: bool,
    pub encoding: String,
    pub strip_html: bool,
    pub enable_formatter: bool,
    pub currency_symbol: String,
    /// Rows fetched per provider page; falls back to the provider's own page
    /// size, and to a single batch when neither is set.
    pub batch_size: Option<usize>,
    /// Ordinals of the columns to export; `None` exports every visible column.
    pub selected_columns: Option<Vec<usize>>,
    pub sheet_name: String,
    pub before_content: Vec<ContentBlock>,
    pub after_content: Vec<ContentBlock>,
    pub formats: BTreeMap<ExportFormat, FormatConfig>,
    pub styles: BTreeMap<ExportFormat, RegionStyles>,
    pub pdf: Option<PdfConfig>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename: "grid-export".to_string(),
            export_folder: std::env::temp_dir(),
            stream: true,
            delete_after_serve: true,
            encoding: "utf-8".to_string(),
            strip_html: true,
            enable_formatter: true,
            currency_symbol: "$".to_string(),
            batch_size: None,
            selected_columns: None,
            sheet_name: "Worksheet".to_string(),
            before_content: Vec::new(),
            after_content: Vec::new(),
            formats: FormatConfig::defaults(),
            styles: BTreeMap::new(),
            pdf: None,
        }
    }
}

impl ExportConfig {
    pub fn format(&self, format: ExportFormat) -> Option<&FormatConfig> {
        self.formats.get(&format)
    }

    pub fn region_styles(&self, format: ExportFormat) -> RegionStyles {
        self.styles.get(&format).cloned().unwrap_or_default()
    }

    /// Sheet row the header lands on; before-content rows push it down.
    pub fn begin_row(&self) -> u32 {
        1 + self.before_content.len() as u32
    }

    pub fn is_utf8(&self) -> bool {
        self.encoding.eq_ignore_ascii_case("utf-8") || self.encoding.eq_ignore_ascii_case("utf8")
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.filename.is_empty() {
            errors.push("Output filename is required".to_string());
        }

        if self.encoding.is_empty() {
            errors.push("Target encoding is required".to_string());
        }

        if self.batch_size == Some(0) {
            errors.push("Batch size must be at least 1".to_string());
        }

        if self.formats.values().all(|f| f.writer.is_none()) {
            errors.push("At least one format must have a writer binding".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExportConfig::default();
        assert!(config.validate().is_empty());
        for format in ExportFormat::ALL {
            assert!(config.format(format).is_some(), "{format:?} missing");
        }
    }

    #[test]
    fn test_validate_reports_problems() {
        let config = ExportConfig {
            filename: String::new(),
            batch_size: Some(0),
            ..ExportConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_begin_row_follows_before_content() {
        let mut config = ExportConfig::default();
        assert_eq!(config.begin_row(), 1);
        config.before_content.push(ContentBlock::new("Report"));
        config.before_content.push(ContentBlock::new("Q3"));
        assert_eq!(config.begin_row(), 3);
    }

    #[test]
    fn test_txt_defaults_to_tab_with_bom() {
        let config = ExportConfig::default();
        let txt = config.format(ExportFormat::Txt).unwrap();
        assert_eq!(txt.delimiter, Some('\t'));
        assert!(txt.bom);
    }
}
