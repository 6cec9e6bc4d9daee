use crate::error::{ExportError, Result};

/// Spreadsheet column name for a 1-based column index.
///
/// Column names form a bijective base-26 numeral system with no zero digit:
/// 1 is "A", 26 is "Z", 27 is "AA", 702 is "ZZ", 703 is "AAA". An index of
/// zero is an error; there is no representation for it.
pub fn column_name(index: u32) -> Result<String> {
    if index == 0 {
        return Err(ExportError::Addressing(index));
    }
    Ok(name_unchecked(index))
}

/// Column name for a 0-based grid column. Infallible since the shift makes
/// the index strictly positive.
pub(crate) fn column_label(col: u16) -> String {
    name_unchecked(u32::from(col) + 1)
}

fn name_unchecked(index: u32) -> String {
    let i = index - 1;
    if i < 26 {
        return char::from(b'A' + i as u8).to_string();
    }
    let mut name = name_unchecked(i / 26);
    name.push(char::from(b'A' + (i % 26) as u8));
    name
}
