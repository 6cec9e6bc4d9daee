//! Grid-to-spreadsheet export engine.
//!
//! Takes a paginated tabular data source plus column definitions and
//! produces a styled artifact in one of several formats: Excel workbooks,
//! CSV, tab-delimited text, an HTML table, or a PDF rendered from that HTML.
//! Rows are fetched in batches, formatted per column, optionally folded into
//! grouped runs with aggregate subtotal rows, laid out on a 2-D sheet grid,
//! and handed to the writer bound to the requested format.
//!
//! ```no_run
//! use grid_exporter::{Column, ExportConfig, ExportFormat, ExportJob, MemoryProvider};
//! use serde_json::json;
//!
//! let columns = vec![
//!     Column::serial(0).with_header("#"),
//!     Column::for_attribute(1, "name").with_header("Name"),
//! ];
//! let provider = MemoryProvider::new(vec![json!({"name": "bolt"})]);
//! let mut job = ExportJob::new(ExportConfig::default(), columns, Box::new(provider));
//! let output = job.run(ExportFormat::Xlsx)?;
//! println!("exported {} rows", output.rows);
//! # Ok::<(), grid_exporter::ExportError>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod hooks;
pub mod job;
pub mod models;
pub mod sheet;
pub mod source;

pub use config::{
    ContentBlock, ExportConfig, ExportFormat, FormatConfig, PdfConfig, WriterKind,
};
pub use error::{ExportError, Result};
pub use export::{Destination, FileDescriptor, ResponseHeaders, SheetWriter};
pub use hooks::{CellEvent, ExportHooks, HookEvent};
pub use job::{ExportJob, ExportOutput};
pub use models::{
    CellStyle, CellValue, Column, ColumnKind, ContentResolver, CustomAggregate, FormatSpec,
    GroupAggregate, RegionStyles, Row,
};
pub use sheet::{column_name, Sheet, SheetBuilder, SheetCursor};
pub use source::{BatchSource, DataProvider, MemoryProvider, ValueSource};
