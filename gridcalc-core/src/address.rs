//! Address Codec
//!
//! Conversion between 1-based `(row, col)` pairs and A1-style addresses, and
//! the canonical graph identity of a cell.
//!
//! Column letters use bijective base-26: the digits 1..=26 map to `A..=Z` and
//! there is no zero digit, so `Z` (26) is followed by `AA` (27).

use crate::error::AddressError;
use crate::graph::NodeId;

/// Largest row index a workbook can address.
pub const MAX_ROW: u32 = 1_048_576;

/// Largest column index a workbook can address (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Convert a 1-based column index to its letters (`1 -> "A"`, `27 -> "AA"`).
///
/// Column 0 has no letters and yields an empty string.
pub fn column_to_letters(col: u32) -> String {
    let mut buf = Vec::new();
    let mut c = col;
    while c > 0 {
        c -= 1;
        buf.push(b'A' + (c % 26) as u8);
        c /= 26;
    }
    buf.reverse();
    // Only ASCII uppercase letters were pushed.
    String::from_utf8(buf).unwrap_or_default()
}

/// Convert column letters (either case) to a 1-based column index.
///
/// Returns `None` for empty input, non-letters, or columns past [`MAX_COLUMN`].
pub fn letters_to_column(letters: &str) -> Option<u32> {
    column_value(letters)
        .filter(|&col| col <= u64::from(MAX_COLUMN))
        .map(|col| col as u32)
}

/// Bijective base-26 value of `letters`, saturating just past `u32::MAX`.
fn column_value(letters: &str) -> Option<u64> {
    if letters.is_empty() {
        return None;
    }
    let cap = u64::from(u32::MAX) + 1;
    letters.bytes().try_fold(0u64, |acc, b| {
        b.is_ascii_alphabetic()
            .then(|| (acc * 26 + u64::from(b.to_ascii_uppercase() - b'A' + 1)).min(cap))
    })
}

/// Format a 1-based `(row, col)` pair as an A1 address.
pub fn row_col_to_address(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row)
}

/// Parse an A1 address (with optional `$` markers) into a 1-based `(row, col)`.
pub fn address_to_row_col(address: &str) -> Result<(u32, u32), AddressError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    let malformed = || AddressError::Malformed(address.to_string());

    let rest = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let split = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(malformed)?;
    let (letters, digits) = rest.split_at(split);
    let digits = digits.strip_prefix('$').unwrap_or(digits);

    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let col = column_value(letters).ok_or_else(malformed)?;
    if col > u64::from(MAX_COLUMN) {
        return Err(AddressError::ColumnOutOfBounds(col));
    }

    let row: u64 = digits.parse().map_err(|_| malformed())?;
    if row == 0 || row > u64::from(MAX_ROW) {
        return Err(AddressError::RowOutOfBounds(row));
    }

    Ok((row as u32, col as u32))
}

/// The graph identity of the cell at `(sheet, row, col)`.
pub fn node_identity(sheet: &str, row: u32, col: u32) -> NodeId {
    NodeId::cell(sheet, row, col)
}
