use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::html::HtmlWriter;
use super::SheetWriter;
use crate::config::PdfConfig;
use crate::error::{ExportError, Result};
use crate::sheet::Sheet;

static RENDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// PDF serializer layered on the HTML writer: the generated markup is fed to
/// an external render backend, so both formats share one cell/style path.
pub struct PdfWriter {
    config: PdfConfig,
    html: HtmlWriter,
}

impl PdfWriter {
    pub fn new(config: PdfConfig, html: HtmlWriter) -> Self {
        Self { config, html }
    }
}

impl SheetWriter for PdfWriter {
    fn write(&self, sheet: &Sheet, out: &mut dyn Write) -> Result<()> {
        if !self.config.backend.is_file() {
            return Err(ExportError::config(format!(
                "PDF rendering backend not found at {}",
                self.config.backend.display()
            )));
        }

        let seq = RENDER_SEQ.fetch_add(1, Ordering::SeqCst);
        let stem = format!("grid-export-{}-{seq}", std::process::id());
        let html_path = std::env::temp_dir().join(format!("{stem}.html"));
        let pdf_path = std::env::temp_dir().join(format!("{stem}.pdf"));

        fs::write(&html_path, self.html.render(sheet))?;
        debug!(backend = %self.config.backend.display(), "rendering pdf");

        let status = Command::new(&self.config.backend)
            .args(&self.config.args)
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        let result = match status {
            Ok(status) if status.success() => match fs::read(&pdf_path) {
                Ok(bytes) => {
                    out.write_all(&bytes)?;
                    Ok(())
                }
                Err(err) => Err(ExportError::PdfBackend(format!(
                    "backend produced no output: {err}"
                ))),
            },
            Ok(status) => Err(ExportError::PdfBackend(format!(
                "backend exited with {status}"
            ))),
            Err(err) => Err(ExportError::PdfBackend(format!(
                "failed to launch backend {}: {err}",
                self.config.backend.display()
            ))),
        };

        let _ = fs::remove_file(&html_path);
        let _ = fs::remove_file(&pdf_path);
        result
    }
}
