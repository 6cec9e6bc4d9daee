use std::fmt;
use std::path::Path;

use tracing::warn;

use crate::models::CellValue;

/// Context handed to per-cell lifecycle hooks.
pub struct CellEvent<'a> {
    /// A1-style reference of the cell being rendered.
    pub cell_ref: String,
    /// Ordinal of the originating column in the full column list.
    pub ordinal: usize,
    pub row: u32,
    pub value: &'a CellValue,
    pub display: &'a str,
}

type Hook = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;
type CellHook = Box<dyn Fn(&CellEvent<'_>) -> anyhow::Result<()> + Send + Sync>;
type FileHook = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Lifecycle event raised through [`ExportHooks::raise`].
pub enum HookEvent<'a> {
    InitDocument,
    InitWriter,
    InitSheet,
    HeaderCell(CellEvent<'a>),
    DataCell(CellEvent<'a>),
    FooterCell(CellEvent<'a>),
    RenderSheet,
}

/// Optional collaborator callbacks fired along the export lifecycle.
///
/// Every slot is optional and best-effort: an unset slot is a no-op and a
/// failing callback is logged, not propagated. The one exception is
/// `on_generate_file`, whose `false` return suppresses removal of the
/// generated artifact.
#[derive(Default)]
pub struct ExportHooks {
    pub on_init_document: Option<Hook>,
    pub on_init_writer: Option<Hook>,
    pub on_init_sheet: Option<Hook>,
    pub on_render_header_cell: Option<CellHook>,
    pub on_render_data_cell: Option<CellHook>,
    pub on_render_footer_cell: Option<CellHook>,
    pub on_render_sheet: Option<Hook>,
    pub on_generate_file: Option<FileHook>,
}

impl ExportHooks {
    /// Single dispatch point for all best-effort events.
    pub fn raise(&self, event: HookEvent<'_>) {
        let (name, result) = match &event {
            HookEvent::InitDocument => ("init_document", run(&self.on_init_document)),
            HookEvent::InitWriter => ("init_writer", run(&self.on_init_writer)),
            HookEvent::InitSheet => ("init_sheet", run(&self.on_init_sheet)),
            HookEvent::HeaderCell(cell) => {
                ("render_header_cell", run_cell(&self.on_render_header_cell, cell))
            }
            HookEvent::DataCell(cell) => {
                ("render_data_cell", run_cell(&self.on_render_data_cell, cell))
            }
            HookEvent::FooterCell(cell) => {
                ("render_footer_cell", run_cell(&self.on_render_footer_cell, cell))
            }
            HookEvent::RenderSheet => ("render_sheet", run(&self.on_render_sheet)),
        };
        if let Err(err) = result {
            warn!(hook = name, error = %err, "export hook failed");
        }
    }

    /// Post-generation hook; returning `false` keeps the artifact on disk.
    pub fn raise_generate_file(&self, path: &Path) -> bool {
        match &self.on_generate_file {
            Some(hook) => hook(path),
            None => true,
        }
    }
}

fn run(hook: &Option<Hook>) -> anyhow::Result<()> {
    match hook {
        Some(hook) => hook(),
        None => Ok(()),
    }
}

fn run_cell(hook: &Option<CellHook>, cell: &CellEvent<'_>) -> anyhow::Result<()> {
    match hook {
        Some(hook) => hook(cell),
        None => Ok(()),
    }
}

impl fmt::Debug for ExportHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |o: bool| if o { "set" } else { "-" };
        write!(
            f,
            "ExportHooks(document:{}, writer:{}, sheet:{}, cells:{}/{}/{}, render:{}, file:{})",
            set(self.on_init_document.is_some()),
            set(self.on_init_writer.is_some()),
            set(self.on_init_sheet.is_some()),
            set(self.on_render_header_cell.is_some()),
            set(self.on_render_data_cell.is_some()),
            set(self.on_render_footer_cell.is_some()),
            set(self.on_render_sheet.is_some()),
            set(self.on_generate_file.is_some()),
        )
    }
}
