use std::io::Write;

use super::SheetWriter;
use crate::error::Result;
use crate::sheet::Sheet;

/// Delimited-text serializer backing both the CSV and the tab-separated
/// text formats.
pub struct DelimitedWriter {
    delimiter: u8,
    with_bom: bool,
}

impl Default for DelimitedWriter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            with_bom: false,
        }
    }
}

impl DelimitedWriter {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Emit a UTF-8 BOM so spreadsheet applications pick up the encoding.
    pub fn with_bom(mut self, with_bom: bool) -> Self {
        self.with_bom = with_bom;
        self
    }
}

impl SheetWriter for DelimitedWriter {
    fn write(&self, sheet: &Sheet, out: &mut dyn Write) -> Result<()> {
        if self.with_bom {
            out.write_all(&[0xEF, 0xBB, 0xBF])?;
        }

        let (max_row, max_col) = sheet.dimensions();
        if max_row == 0 {
            return Ok(());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);

        for row in 1..=max_row {
            let record: Vec<&str> = (0..=max_col).map(|col| sheet.display_at(col, row)).collect();
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn sample_sheet() -> Sheet {
        let mut sheet = Sheet::new("t");
        sheet.write_cell(0, 1, Cell::text("name"));
        sheet.write_cell(1, 1, Cell::text("qty"));
        sheet.write_cell(0, 2, Cell::text("bolt, m4"));
        sheet.write_cell(1, 2, Cell::text("7"));
        sheet
    }

    #[test]
    fn test_csv_output_quotes_delimiters() {
        let sheet = sample_sheet();
        let mut buf = Vec::new();
        DelimitedWriter::new(b',').write(&sheet, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "name,qty\n\"bolt, m4\",7\n");
    }

    #[test]
    fn test_tab_delimited_with_bom() {
        let sheet = sample_sheet();
        let mut buf = Vec::new();
        DelimitedWriter::new(b'\t')
            .with_bom(true)
            .write(&sheet, &mut buf)
            .unwrap();
        assert_eq!(&buf[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(buf[3..].to_vec()).unwrap();
        assert_eq!(text, "name\tqty\nbolt, m4\t7\n");
    }

    #[test]
    fn test_empty_sheet_writes_nothing() {
        let sheet = Sheet::new("t");
        let mut buf = Vec::new();
        DelimitedWriter::new(b',').write(&sheet, &mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_unwritten_cells_become_empty_fields() {
        let mut sheet = Sheet::new("t");
        sheet.write_cell(2, 1, Cell::text("c"));
        let mut buf = Vec::new();
        DelimitedWriter::new(b',').write(&sheet, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), ",,c\n");
    }
}
