pub mod csv;
pub mod excel;
pub mod html;
pub mod pdf;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ExportConfig, ExportFormat, FormatConfig, WriterKind};
use crate::error::{ExportError, Result};
use crate::hooks::{ExportHooks, HookEvent};
use crate::sheet::Sheet;

/// Serializes a finished sheet grid into one output format.
pub trait SheetWriter {
    fn write(&self, sheet: &Sheet, out: &mut dyn Write) -> Result<()>;
}

/// HTTP-style response metadata for a streamed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: String,
    pub content_disposition: String,
    /// Cache-prevention header pairs.
    pub cache: Vec<(String, String)>,
}

impl ResponseHeaders {
    fn attachment(format: &FormatConfig, config: &ExportConfig) -> Self {
        Self {
            content_type: format!("{}; charset={}", format.mime, config.encoding),
            content_disposition: format!(
                "attachment; filename=\"{}.{}\"",
                config.filename, format.extension
            ),
            cache: vec![
                ("Pragma".to_string(), "public".to_string()),
                ("Expires".to_string(), "0".to_string()),
                (
                    "Cache-Control".to_string(),
                    "must-revalidate, post-check=0, pre-check=0".to_string(),
                ),
            ],
        }
    }
}

/// Download-link descriptor for a saved (non-streamed) artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_name: String,
    pub href: String,
    pub icon: String,
}

/// Where the generated artifact ended up.
#[derive(Debug)]
pub enum Destination {
    /// Bytes to copy into the response; the temporary file is already gone.
    Stream {
        bytes: Vec<u8>,
        headers: ResponseHeaders,
    },
    /// Artifact persisted under the export folder.
    Saved {
        path: PathBuf,
        descriptor: FileDescriptor,
    },
}

/// Check that `format` can be dispatched with the given configuration.
///
/// Run before any row generation so misconfiguration never costs a full
/// body pass.
pub fn preflight(format: ExportFormat, config: &ExportConfig) -> Result<()> {
    let format_config = config
        .format(format)
        .ok_or_else(|| ExportError::config(format!("no configuration registered for {format:?}")))?;
    let kind = format_config.writer.ok_or_else(|| {
        ExportError::config(format!("no writer binding registered for {format:?}"))
    })?;

    if kind == WriterKind::Pdf {
        let pdf = config
            .pdf
            .as_ref()
            .ok_or_else(|| ExportError::config("PDF rendering backend is not configured"))?;
        if !pdf.backend.is_file() {
            return Err(ExportError::config(format!(
                "PDF rendering backend not found at {}",
                pdf.backend.display()
            )));
        }
    }

    fs::create_dir_all(&config.export_folder).map_err(|err| {
        ExportError::config(format!(
            "export folder {} is not writable: {err}",
            config.export_folder.display()
        ))
    })?;
    Ok(())
}

fn make_writer(
    kind: WriterKind,
    format_config: &FormatConfig,
    config: &ExportConfig,
) -> Result<Box<dyn SheetWriter>> {
    match kind {
        WriterKind::Spreadsheet => Ok(Box::new(excel::ExcelWriter::new())),
        WriterKind::Delimited => {
            let delimiter = match format_config.delimiter {
                Some(c) if c.is_ascii() => c as u8,
                _ => b',',
            };
            let bom = format_config.bom && config.is_utf8();
            Ok(Box::new(csv::DelimitedWriter::new(delimiter).with_bom(bom)))
        }
        WriterKind::Html => Ok(Box::new(html::HtmlWriter::new(&config.encoding))),
        WriterKind::Pdf => {
            let pdf = config
                .pdf
                .clone()
                .ok_or_else(|| ExportError::config("PDF rendering backend is not configured"))?;
            Ok(Box::new(pdf::PdfWriter::new(
                pdf,
                html::HtmlWriter::new(&config.encoding),
            )))
        }
    }
}

/// Serialize `sheet` with the writer bound to `format` and hand the artifact
/// to its destination: streamed bytes (temporary file removed) or a saved
/// file plus link descriptor.
pub fn dispatch(
    format: ExportFormat,
    config: &ExportConfig,
    sheet: &Sheet,
    hooks: &ExportHooks,
) -> Result<Destination> {
    preflight(format, config)?;
    let format_config = config
        .format(format)
        .ok_or_else(|| ExportError::config(format!("no configuration registered for {format:?}")))?;
    let kind = format_config.writer.ok_or_else(|| {
        ExportError::config(format!("no writer binding registered for {format:?}"))
    })?;
    let writer = make_writer(kind, format_config, config)?;

    let path = config
        .export_folder
        .join(format!("{}.{}", config.filename, format_config.extension));

    hooks.raise(HookEvent::InitWriter);

    if let Err(err) = write_artifact(writer.as_ref(), sheet, &path) {
        // Never leave a partial artifact behind.
        let _ = fs::remove_file(&path);
        return Err(err);
    }
    debug!(path = %path.display(), "artifact written");

    if config.stream {
        let bytes = fs::read(&path)?;
        if config.delete_after_serve && hooks.raise_generate_file(&path) {
            let _ = fs::remove_file(&path);
        }
        info!(format = ?format, bytes = bytes.len(), "export streamed");
        Ok(Destination::Stream {
            bytes,
            headers: ResponseHeaders::attachment(format_config, config),
        })
    } else {
        hooks.raise_generate_file(&path);
        info!(format = ?format, path = %path.display(), "export saved");
        Ok(Destination::Saved {
            descriptor: FileDescriptor {
                file_name: format!("{}.{}", config.filename, format_config.extension),
                href: path.display().to_string(),
                icon: format_config.icon.clone(),
            },
            path,
        })
    }
}

fn write_artifact(writer: &dyn SheetWriter, sheet: &Sheet, path: &Path) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    writer.write(sheet, &mut out)?;
    out.flush()?;
    Ok(())
}
