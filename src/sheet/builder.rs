use tracing::debug;

use crate::config::{ExportConfig, ExportFormat};
use crate::error::Result;
use crate::hooks::{CellEvent, ExportHooks, HookEvent};
use crate::models::{
    CellStyle, CellValue, Column, HorizontalAlign, RegionStyles, VerticalAlign,
};
use crate::sheet::formatter::CellFormatter;
use crate::sheet::grouping::{ClosedRun, GroupingEngine};
use crate::sheet::{Cell, CellRange, Sheet, SheetCursor};
use crate::source::BatchSource;

/// Baseline region styles a caller's style options are layered over.
fn default_region_styles() -> RegionStyles {
    RegionStyles {
        header: CellStyle {
            bold: Some(true),
            align: Some(HorizontalAlign::Center),
            valign: Some(VerticalAlign::Middle),
            ..CellStyle::default()
        },
        body: CellStyle::default(),
        group_row: CellStyle::bold(),
        box_style: CellStyle::default(),
    }
}

/// Generates the sheet grid: before-content, header, body with grouping,
/// footer, after-content, then autofilter and box styling.
///
/// All run-scoped bookkeeping lives in the [`SheetCursor`] value threaded
/// through the passes; the builder itself is immutable during a run.
pub struct SheetBuilder<'a> {
    config: &'a ExportConfig,
    columns: &'a [Column],
    formatter: CellFormatter,
    styles: RegionStyles,
    hooks: &'a ExportHooks,
    messages: &'a (dyn Fn(&str) -> String + Send + Sync),
}

impl<'a> SheetBuilder<'a> {
    /// `columns` must already be filtered down to the visible subset, in
    /// ordinal order.
    pub fn new(
        config: &'a ExportConfig,
        format: ExportFormat,
        columns: &'a [Column],
        hooks: &'a ExportHooks,
        messages: &'a (dyn Fn(&str) -> String + Send + Sync),
    ) -> Self {
        let mut styles = config.region_styles(format);
        let defaults = default_region_styles();
        styles.header.merge_missing(&defaults.header);
        styles.body.merge_missing(&defaults.body);
        styles.group_row.merge_missing(&defaults.group_row);
        styles.box_style.merge_missing(&defaults.box_style);

        Self {
            config,
            columns,
            formatter: CellFormatter::new(config),
            styles,
            hooks,
            messages,
        }
    }

    pub fn build(&self, sheet: &mut Sheet, source: &mut BatchSource) -> Result<SheetCursor> {
        let mut cursor = SheetCursor::new(self.config.begin_row(), self.columns.len() as u16);

        if self.columns.is_empty() {
            // Nothing to export: a single placeholder cell, no data rows.
            sheet.write_cell(0, 1, Cell::text(""));
            cursor.end_row = 1;
            cursor.body_end_row = 1;
            return Ok(cursor);
        }

        self.write_before_content(sheet, &mut cursor);
        self.write_header(sheet, &mut cursor, source)?;
        self.write_body(sheet, &mut cursor, source)?;
        cursor.body_end_row = cursor.end_row;
        self.write_footer(sheet, &mut cursor);
        self.write_after_content(sheet, &mut cursor);
        self.apply_box_styling(sheet, &cursor);

        debug!(
            rows = cursor.data_rows,
            end_row = cursor.end_row,
            end_col = cursor.end_col,
            "sheet generated"
        );
        Ok(cursor)
    }

    fn write_before_content(&self, sheet: &mut Sheet, cursor: &mut SheetCursor) {
        for (i, block) in self.config.before_content.iter().enumerate() {
            let row = i as u32 + 1;
            let text = (self.messages)(&block.value);
            let mut cell = Cell::text(&text);
            cell.style = block.style.clone();
            sheet.write_cell(0, row, cell);
            if cursor.end_col > 1 {
                sheet.merge(CellRange::new(0, row, cursor.end_col - 1, row));
            }
        }
    }

    fn write_header(
        &self,
        sheet: &mut Sheet,
        cursor: &mut SheetCursor,
        source: &mut BatchSource,
    ) -> Result<()> {
        let row = cursor.begin_row;
        let value_source = source.value_source();
        // A model to look attribute labels up against, when one exists.
        let first_model = source.peek()?.map(|r| r.model.clone());

        for (slot, column) in self.columns.iter().enumerate() {
            let text = match &column.header {
                Some(header) => (self.messages)(header),
                None => match &column.attribute {
                    Some(attribute) => {
                        let label = first_model
                            .as_ref()
                            .and_then(|m| value_source.attribute_label(m, attribute));
                        match label {
                            Some(label) => label,
                            None => (self.messages)(&crate::models::column::humanize_attribute(
                                attribute,
                            )),
                        }
                    }
                    None => String::new(),
                },
            };

            let col = slot as u16;
            let cell = Cell::new(
                CellValue::Text(text.clone()),
                text,
                self.styles.header.clone(),
            );
            self.hooks.raise(HookEvent::HeaderCell(CellEvent {
                cell_ref: Sheet::cell_ref(col, row),
                ordinal: column.ordinal,
                row,
                value: &cell.value,
                display: &cell.display,
            }));
            sheet.write_cell(col, row, cell);
        }

        sheet.freeze_rows(row);
        cursor.end_row = row;
        Ok(())
    }

    fn write_body(
        &self,
        sheet: &mut Sheet,
        cursor: &mut SheetCursor,
        source: &mut BatchSource,
    ) -> Result<()> {
        let mut engine = GroupingEngine::new(self.columns.len(), cursor.begin_row);
        let value_source = source.value_source();
        let grouped_slots: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.group)
            .map(|(slot, _)| slot)
            .collect();

        while let Some(row) = source.next_row()? {
            let line = row.index + 1;
            let row_num = cursor.end_row + 1;

            let values: Vec<CellValue> = self
                .columns
                .iter()
                .map(|column| self.formatter.resolve_value(value_source, column, &row))
                .collect();

            for (slot, column) in self.columns.iter().enumerate() {
                let col = slot as u16;
                let display = self.formatter.display(&values[slot], column.format.as_ref());
                let style = self.formatter.style_for(column, &self.styles.body);
                let cell = Cell::new(values[slot].clone(), display, style);
                self.hooks.raise(HookEvent::DataCell(CellEvent {
                    cell_ref: Sheet::cell_ref(col, row_num),
                    ordinal: column.ordinal,
                    row: row_num,
                    value: &cell.value,
                    display: &cell.display,
                }));
                sheet.write_cell(col, row_num, cell);
            }
            cursor.end_row = row_num;
            cursor.data_rows += 1;

            if grouped_slots.is_empty() {
                continue;
            }

            // One row of lookahead drives the boundary check; the end of
            // data forces the final runs closed.
            let next_values: Option<Vec<(usize, CellValue)>> = match source.peek()? {
                Some(next_row) => Some(
                    grouped_slots
                        .iter()
                        .map(|&slot| {
                            (
                                slot,
                                self.formatter.resolve_value(
                                    value_source,
                                    &self.columns[slot],
                                    next_row,
                                ),
                            )
                        })
                        .collect(),
                ),
                None => None,
            };

            match next_values {
                Some(next_values) => {
                    for (slot, next_value) in next_values {
                        if let Some(run) = engine.observe(slot, &values[slot], &next_value, line) {
                            self.write_group_row(sheet, cursor, &engine, &run);
                        }
                    }
                }
                None => {
                    // Make sure single-row datasets still open their run.
                    for &slot in &grouped_slots {
                        engine.observe(slot, &values[slot], &values[slot], line);
                    }
                    for run in engine.finish(line) {
                        self.write_group_row(sheet, cursor, &engine, &run);
                    }
                }
            }
        }
        Ok(())
    }

    /// Insert one aggregate row right after the row that closed the run and
    /// merge the run's cells in the grouped column.
    fn write_group_row(
        &self,
        sheet: &mut Sheet,
        cursor: &mut SheetCursor,
        engine: &GroupingEngine,
        run: &ClosedRun,
    ) {
        let start = engine.range_start_row(run.first_line);
        let end = cursor.end_row;
        let row_num = cursor.end_row + 1;

        for (slot, column) in self.columns.iter().enumerate() {
            let col = slot as u16;
            let value = match &column.group_footer {
                Some(aggregate) => {
                    aggregate.compute(&Sheet::column_range_ref(col, start, end))
                }
                None => CellValue::Null,
            };
            let display = value.to_string();
            let style = self.formatter.style_for(column, &self.styles.group_row);
            sheet.write_cell(col, row_num, Cell::new(value, display, style));
        }

        let group_col = run.column as u16;
        sheet.merge(CellRange::new(group_col, start, group_col, end));
        cursor.end_row = row_num;
    }

    fn write_footer(&self, sheet: &mut Sheet, cursor: &mut SheetCursor) {
        let row = cursor.end_row + 1;
        for (slot, column) in self.columns.iter().enumerate() {
            let Some(footer) = &column.footer else {
                continue;
            };
            let col = slot as u16;
            let text = (self.messages)(footer);
            let cell = Cell::new(
                CellValue::Text(text.clone()),
                text,
                self.styles.header.clone(),
            );
            self.hooks.raise(HookEvent::FooterCell(CellEvent {
                cell_ref: Sheet::cell_ref(col, row),
                ordinal: column.ordinal,
                row,
                value: &cell.value,
                display: &cell.display,
            }));
            sheet.write_cell(col, row, cell);
            cursor.any_footer = true;
        }
        if cursor.any_footer {
            cursor.end_row = row;
        }
    }

    fn write_after_content(&self, sheet: &mut Sheet, cursor: &mut SheetCursor) {
        for block in &self.config.after_content {
            let row = cursor.end_row + 1;
            let text = (self.messages)(&block.value);
            let mut cell = Cell::text(&text);
            cell.style = block.style.clone();
            sheet.write_cell(0, row, cell);
            if cursor.end_col > 1 {
                sheet.merge(CellRange::new(0, row, cursor.end_col - 1, row));
            }
            cursor.end_row = row;
        }
    }

    /// Autofilter over the header+body rectangle, then the box border/fill
    /// merged into it, independent of per-cell formatting.
    fn apply_box_styling(&self, sheet: &mut Sheet, cursor: &SheetCursor) {
        let range = CellRange::new(
            0,
            cursor.begin_row,
            cursor.end_col.saturating_sub(1),
            cursor.body_end_row,
        );
        sheet.set_autofilter(range);
        sheet.apply_style_region(range, &self.styles.box_style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormatSpec, GroupAggregate};
    use crate::source::MemoryProvider;
    use serde_json::json;

    fn identity(s: &str) -> String {
        s.to_string()
    }

    fn build_sheet(
        config: &ExportConfig,
        columns: &[Column],
        models: Vec<serde_json::Value>,
    ) -> (Sheet, SheetCursor) {
        let hooks = ExportHooks::default();
        let builder = SheetBuilder::new(config, ExportFormat::Csv, columns, &hooks, &identity);
        let mut source = BatchSource::new(
            Box::new(MemoryProvider::new(models)),
            config.batch_size,
        )
        .unwrap();
        let mut sheet = Sheet::new(&config.sheet_name);
        let cursor = builder.build(&mut sheet, &mut source).unwrap();
        (sheet, cursor)
    }

    #[test]
    fn test_header_and_body_layout() {
        let config = ExportConfig::default();
        let columns = vec![
            Column::for_attribute(0, "name").with_header("Name"),
            Column::for_attribute(1, "unit_price"),
        ];
        let (sheet, cursor) = build_sheet(
            &config,
            &columns,
            vec![json!({"name": "a", "unit_price": 2}), json!({"name": "b", "unit_price": 3})],
        );

        assert_eq!(sheet.display_at(0, 1), "Name");
        // Humanized fallback for the unlabeled attribute.
        assert_eq!(sheet.display_at(1, 1), "Unit Price");
        assert_eq!(sheet.display_at(0, 2), "a");
        assert_eq!(sheet.display_at(1, 3), "3");
        assert_eq!(cursor.data_rows, 2);
        assert_eq!(cursor.end_col, 2);
        assert_eq!(sheet.frozen_rows(), Some(1));
    }

    #[test]
    fn test_grouping_emits_aggregate_rows() {
        let config = ExportConfig::default();
        let columns = vec![
            Column::for_attribute(0, "g").grouped(),
            Column::for_attribute(1, "v").with_group_footer(GroupAggregate::Sum),
        ];
        let (sheet, cursor) = build_sheet(
            &config,
            &columns,
            vec![
                json!({"g": "A", "v": 1}),
                json!({"g": "A", "v": 2}),
                json!({"g": "B", "v": 3}),
            ],
        );

        // Data rows 2 and 3 hold the A run; the aggregate lands on row 4.
        assert_eq!(sheet.display_at(0, 2), "A");
        assert_eq!(sheet.display_at(0, 3), "A");
        assert_eq!(sheet.display_at(1, 4), "=SUM(B2:B3)");
        // The B row shifts below the aggregate; its terminal aggregate
        // closes the run at the end of data.
        assert_eq!(sheet.display_at(0, 5), "B");
        assert_eq!(sheet.display_at(1, 6), "=SUM(B5:B5)");
        assert_eq!(cursor.data_rows, 3);
        // Merged display cell over the A run in the grouped column.
        assert!(sheet
            .merges()
            .iter()
            .any(|m| m.first_col == 0 && m.first_row == 2 && m.last_row == 3));
    }

    #[test]
    fn test_uniform_run_closes_terminally() {
        let config = ExportConfig::default();
        let columns = vec![
            Column::for_attribute(0, "g").grouped(),
            Column::for_attribute(1, "v").with_group_footer(GroupAggregate::Sum),
        ];
        let (sheet, cursor) = build_sheet(
            &config,
            &columns,
            vec![json!({"g": "A", "v": 1}), json!({"g": "A", "v": 2})],
        );

        assert_eq!(cursor.data_rows, 2);
        assert_eq!(sheet.display_at(1, 4), "=SUM(B2:B3)");
    }

    #[test]
    fn test_zero_visible_columns_placeholder() {
        let config = ExportConfig::default();
        let (sheet, cursor) = build_sheet(&config, &[], vec![json!({"x": 1})]);
        assert_eq!(sheet.cell_count(), 1);
        assert_eq!(cursor.data_rows, 0);
        assert_eq!(cursor.end_col, 0);
    }

    #[test]
    fn test_footer_row() {
        let config = ExportConfig::default();
        let columns = vec![
            Column::for_attribute(0, "a"),
            Column::for_attribute(1, "b").with_footer("Total"),
        ];
        let (sheet, cursor) = build_sheet(&config, &columns, vec![json!({"a": 1, "b": 2})]);
        assert!(cursor.any_footer);
        assert_eq!(sheet.display_at(1, 3), "Total");
        assert_eq!(cursor.end_row, 3);
    }

    #[test]
    fn test_before_content_shifts_header() {
        let mut config = ExportConfig::default();
        config
            .before_content
            .push(crate::config::ContentBlock::new("Quarterly Report"));
        let columns = vec![
            Column::for_attribute(0, "a"),
            Column::for_attribute(1, "b"),
        ];
        let (sheet, cursor) = build_sheet(&config, &columns, vec![json!({"a": 1, "b": 2})]);

        assert_eq!(sheet.display_at(0, 1), "Quarterly Report");
        assert_eq!(cursor.begin_row, 2);
        assert_eq!(sheet.display_at(0, 2), "A");
        assert_eq!(sheet.display_at(0, 3), "1");
        // The title row is merged across the full width.
        assert!(sheet
            .merges()
            .iter()
            .any(|m| m.first_row == 1 && m.last_col == 1));
    }

    #[test]
    fn test_serial_column_counts_across_batches() {
        let mut config = ExportConfig::default();
        config.batch_size = Some(2);
        let columns = vec![
            Column::serial(0).with_header("#"),
            Column::for_attribute(1, "v"),
        ];
        let (sheet, _) = build_sheet(
            &config,
            &columns,
            (0..5).map(|i| json!({"v": i})).collect(),
        );
        assert_eq!(sheet.display_at(0, 2), "1");
        assert_eq!(sheet.display_at(0, 6), "5");
    }

    #[test]
    fn test_formatted_cells_keep_raw_value() {
        let config = ExportConfig::default();
        let columns = vec![Column::for_attribute(0, "amount").with_format(FormatSpec::currency(2))];
        let (sheet, _) = build_sheet(&config, &columns, vec![json!({"amount": 1234.5})]);
        let cell = sheet.cell(0, 2).unwrap();
        assert_eq!(cell.display, "$1,234.50");
        assert_eq!(cell.value, CellValue::Float(1234.5));
        assert_eq!(cell.style.num_format.as_deref(), Some("$#,##0.00"));
    }

    #[test]
    fn test_autofilter_covers_header_and_body() {
        let config = ExportConfig::default();
        let columns = vec![
            Column::for_attribute(0, "a"),
            Column::for_attribute(1, "b"),
        ];
        let (sheet, _) = build_sheet(
            &config,
            &columns,
            vec![json!({"a": 1, "b": 2}), json!({"a": 3, "b": 4})],
        );
        let filter = sheet.autofilter().unwrap();
        assert_eq!(filter.first_row, 1);
        assert_eq!(filter.last_row, 3);
        assert_eq!(filter.last_col, 1);
    }
}
