use tracing::{error, info};

use crate::config::{ExportConfig, ExportFormat};
use crate::error::{ExportError, Result};
use crate::export::{self, Destination};
use crate::hooks::{ExportHooks, HookEvent};
use crate::models::Column;
use crate::sheet::{Sheet, SheetBuilder};
use crate::source::{BatchSource, DataProvider};

type MessageLookup = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Result of one export run.
#[derive(Debug)]
pub struct ExportOutput {
    /// Data rows written (aggregate and footer rows excluded).
    pub rows: u64,
    pub destination: Destination,
}

/// One export request: configuration, columns, a data provider, and optional
/// hooks. A job runs exactly once; the in-memory sheet it builds is released
/// when the run finishes, whether it succeeded or failed.
pub struct ExportJob {
    config: ExportConfig,
    columns: Vec<Column>,
    provider: Option<Box<dyn DataProvider>>,
    hooks: ExportHooks,
    messages: MessageLookup,
}

impl ExportJob {
    pub fn new(
        config: ExportConfig,
        columns: Vec<Column>,
        provider: Box<dyn DataProvider>,
    ) -> Self {
        Self {
            config,
            columns,
            provider: Some(provider),
            hooks: ExportHooks::default(),
            // Identity lookup; callers plug their own translation source in.
            messages: Box::new(|text| text.to_string()),
        }
    }

    pub fn with_hooks(mut self, hooks: ExportHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the message lookup used for headers, footers, and content
    /// blocks. This is the explicit stand-in for ambient translation state.
    pub fn with_messages(
        mut self,
        messages: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.messages = Box::new(messages);
        self
    }

    /// Columns that will occupy sheet slots, in ordinal order.
    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.is_exportable(self.config.selected_columns.as_deref()))
            .collect()
    }

    pub fn run(&mut self, format: ExportFormat) -> Result<ExportOutput> {
        let problems = self.config.validate();
        if !problems.is_empty() {
            return Err(ExportError::config(problems.join("; ")));
        }
        // Writer binding, PDF backend and export folder are checked before
        // any row is fetched.
        export::preflight(format, &self.config)?;

        let provider = self
            .provider
            .take()
            .ok_or_else(|| ExportError::config("export job has already run"))?;
        let mut source = BatchSource::new(provider, self.config.batch_size)?;

        let visible: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| c.is_exportable(self.config.selected_columns.as_deref()))
            .cloned()
            .collect();
        info!(
            format = ?format,
            columns = visible.len(),
            total = source.total_count(),
            "starting export"
        );

        self.hooks.raise(HookEvent::InitDocument);
        let sheet_name = (self.messages)(&self.config.sheet_name);
        let mut sheet = Sheet::new(&sheet_name);
        self.hooks.raise(HookEvent::InitSheet);

        let builder = SheetBuilder::new(
            &self.config,
            format,
            &visible,
            &self.hooks,
            &*self.messages,
        );
        let generated = builder.build(&mut sheet, &mut source);

        let outcome = match generated {
            Ok(cursor) => {
                self.hooks.raise(HookEvent::RenderSheet);
                export::dispatch(format, &self.config, &sheet, &self.hooks).map(|destination| {
                    ExportOutput {
                        rows: cursor.data_rows,
                        destination,
                    }
                })
            }
            Err(err) => Err(err),
        };

        // The grid can hold the whole result set; release it no matter how
        // the run ended.
        sheet.release();

        match &outcome {
            Ok(output) => info!(rows = output.rows, "export complete"),
            Err(err) => error!(error = %err, "export failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentBlock;
    use crate::models::{CellValue, ContentResolver, FormatSpec, GroupAggregate};
    use crate::source::MemoryProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn sample_columns() -> Vec<Column> {
        vec![
            Column::for_attribute(0, "name").with_header("Name"),
            Column::for_attribute(1, "qty").with_header("Qty"),
        ]
    }

    fn sample_models() -> Vec<serde_json::Value> {
        vec![
            json!({"name": "bolt", "qty": 7}),
            json!({"name": "nut", "qty": 3}),
        ]
    }

    fn config_in(dir: &std::path::Path) -> ExportConfig {
        ExportConfig {
            export_folder: dir.to_path_buf(),
            ..ExportConfig::default()
        }
    }

    fn stream_bytes(output: ExportOutput) -> Vec<u8> {
        match output.destination {
            Destination::Stream { bytes, .. } => bytes,
            other => panic!("expected stream, got {other:?}"),
        }
    }

    #[test]
    fn test_csv_export_end_to_end() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let output = job.run(ExportFormat::Csv).unwrap();
        assert_eq!(output.rows, 2);

        let bytes = stream_bytes(output);
        // BOM, then the grid.
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "Name,Qty\nbolt,7\nnut,3\n");

        // The streaming temp file is gone.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let bytes = stream_bytes(job.run(ExportFormat::Csv).unwrap());

        let mut reader = csv::Reader::from_reader(&bytes[3..]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "bolt");
        assert_eq!(&rows[1][1], "3");
    }

    #[test]
    fn test_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let run = || {
            let mut job = ExportJob::new(
                config_in(dir.path()),
                sample_columns(),
                Box::new(MemoryProvider::new(sample_models())),
            );
            stream_bytes(job.run(ExportFormat::Txt).unwrap())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_grouping_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let columns = vec![
            Column::for_attribute(0, "g").with_header("G").grouped(),
            Column::for_attribute(1, "v")
                .with_header("V")
                .with_group_footer(GroupAggregate::Sum),
        ];
        let models = vec![
            json!({"g": "A", "v": 1}),
            json!({"g": "A", "v": 2}),
            json!({"g": "B", "v": 3}),
        ];
        let mut job = ExportJob::new(
            config_in(dir.path()),
            columns,
            Box::new(MemoryProvider::new(models)),
        );
        let output = job.run(ExportFormat::Csv).unwrap();
        assert_eq!(output.rows, 3);

        let bytes = stream_bytes(output);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "G,V",
                "A,1",
                "A,2",
                ",=SUM(B2:B3)",
                "B,3",
                ",=SUM(B5:B5)",
            ]
        );
    }

    #[test]
    fn test_visibility_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let columns = vec![
            Column::serial(0).with_header("#"),
            Column::for_attribute(1, "name").with_header("Name"),
            Column::for_attribute(2, "secret").with_header("Secret").no_export(),
            Column::action(3),
        ];
        let config = ExportConfig {
            selected_columns: Some(vec![0, 1, 2, 3]),
            ..config_in(dir.path())
        };
        let mut job = ExportJob::new(
            config,
            columns,
            Box::new(MemoryProvider::new(vec![json!({"name": "x", "secret": "s"})])),
        );
        assert_eq!(job.visible_columns().len(), 2);

        let bytes = stream_bytes(job.run(ExportFormat::Csv).unwrap());
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "#,Name\n1,x\n");
        assert!(!text.contains("Secret"));
    }

    #[test]
    fn test_empty_selection_excludes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            selected_columns: Some(Vec::new()),
            ..config_in(dir.path())
        };
        let mut job = ExportJob::new(
            config,
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let output = job.run(ExportFormat::Csv).unwrap();
        assert_eq!(output.rows, 0);
    }

    #[test]
    fn test_saved_file_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            stream: false,
            ..config_in(dir.path())
        };
        let mut job = ExportJob::new(
            config,
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let output = job.run(ExportFormat::Html).unwrap();
        match output.destination {
            Destination::Saved { path, descriptor } => {
                assert!(path.exists());
                assert_eq!(descriptor.file_name, "grid-export.html");
                assert_eq!(descriptor.icon, "file-code");
                assert!(descriptor.href.ends_with("grid-export.html"));
            }
            other => panic!("expected saved file, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_file_hook_keeps_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = ExportHooks {
            on_generate_file: Some(Box::new(|_| false)),
            ..ExportHooks::default()
        };
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        )
        .with_hooks(hooks);
        job.run(ExportFormat::Csv).unwrap();
        assert!(dir.path().join("grid-export.csv").exists());
    }

    #[test]
    fn test_cell_hooks_fire_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let data_cells = Arc::new(AtomicUsize::new(0));
        let counter = data_cells.clone();
        let hooks = ExportHooks {
            on_render_data_cell: Some(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..ExportHooks::default()
        };
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        )
        .with_hooks(hooks);
        job.run(ExportFormat::Csv).unwrap();
        // 2 rows x 2 columns.
        assert_eq!(data_cells.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_message_lookup_translates_headers() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            before_content: vec![ContentBlock::new("report.title")],
            ..config_in(dir.path())
        };
        let mut job = ExportJob::new(
            config,
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        )
        .with_messages(|key| match key {
            "report.title" => "Inventur".to_string(),
            "Name" => "Bezeichnung".to_string(),
            other => other.to_string(),
        });
        let bytes = stream_bytes(job.run(ExportFormat::Csv).unwrap());
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.starts_with("Inventur,\n"));
        assert!(text.contains("Bezeichnung,Qty"));
    }

    #[test]
    fn test_job_runs_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        job.run(ExportFormat::Csv).unwrap();
        let err = job.run(ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
    }

    struct FailingProvider {
        inner: MemoryProvider,
        fail_on_page: usize,
        page: usize,
    }

    impl DataProvider for FailingProvider {
        fn total_count(&mut self) -> anyhow::Result<u64> {
            self.inner.total_count()
        }
        fn page_size(&self) -> Option<usize> {
            self.inner.page_size()
        }
        fn configure_paging(&mut self, page_size: usize) -> bool {
            self.inner.configure_paging(page_size)
        }
        fn set_page(&mut self, page: usize) {
            self.page = page;
            self.inner.set_page(page);
        }
        fn refresh(&mut self) -> anyhow::Result<()> {
            if self.page >= self.fail_on_page {
                anyhow::bail!("storage went away");
            }
            self.inner.refresh()
        }
        fn models(&self) -> Vec<crate::models::Model> {
            self.inner.models()
        }
        fn keys(&self) -> Vec<crate::models::Key> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_provider_failure_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            batch_size: Some(1),
            ..config_in(dir.path())
        };
        let provider = FailingProvider {
            inner: MemoryProvider::new(sample_models()),
            fail_on_page: 1,
            page: 0,
        };
        let mut job = ExportJob::new(config, sample_columns(), Box::new(provider));
        let err = job.run(ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, ExportError::Provider(_)));
        // No partial artifact reaches the destination.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unbound_format_fails_before_provider_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        if let Some(entry) = config.formats.get_mut(&ExportFormat::Pdf) {
            entry.writer = None;
        }
        let mut job = ExportJob::new(
            config,
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let err = job.run(ExportFormat::Pdf).unwrap_err();
        assert!(matches!(err, ExportError::Configuration(_)));
        // The provider was never consumed; the job can still run another
        // format.
        let output = job.run(ExportFormat::Csv).unwrap();
        assert_eq!(output.rows, 2);
    }

    #[test]
    fn test_currency_column_formats_in_output() {
        let dir = tempfile::tempdir().unwrap();
        let columns = vec![
            Column::for_attribute(0, "name").with_header("Name"),
            Column::for_attribute(1, "price")
                .with_header("Price")
                .with_format(FormatSpec::currency(2)),
        ];
        let mut job = ExportJob::new(
            config_in(dir.path()),
            columns,
            Box::new(MemoryProvider::new(vec![json!({"name": "x", "price": 1234.5})])),
        );
        let bytes = stream_bytes(job.run(ExportFormat::Csv).unwrap());
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.contains("\"$1,234.50\""));
    }

    #[test]
    fn test_content_resolver_column() {
        let dir = tempfile::tempdir().unwrap();
        let columns = vec![Column::new(0)
            .with_header("Upper")
            .with_content(ContentResolver::new(|model, _, _| {
                CellValue::Text(
                    model["name"]
                        .as_str()
                        .unwrap_or("")
                        .to_uppercase(),
                )
            }))];
        let mut job = ExportJob::new(
            config_in(dir.path()),
            columns,
            Box::new(MemoryProvider::new(vec![json!({"name": "bolt"})])),
        );
        let bytes = stream_bytes(job.run(ExportFormat::Csv).unwrap());
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "Upper\nBOLT\n");
    }

    #[test]
    fn test_xlsx_export_produces_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = ExportJob::new(
            config_in(dir.path()),
            sample_columns(),
            Box::new(MemoryProvider::new(sample_models())),
        );
        let bytes = stream_bytes(job.run(ExportFormat::Xlsx).unwrap());
        assert_eq!(&bytes[..2], b"PK");
    }
}
