//! A1-style cell references ("AO256") and column letters ("AM")

use crate::error::{Error, Result};

/// Convert a 0-based column index to its letter name (0 -> "A", 26 -> "AA")
pub fn column_name(col: u16) -> String {
    let mut n = u32::from(col) + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        name.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Convert a column letter name to a 0-based index ("A" -> 0, "AQ" -> 42)
pub fn column_index(name: &str) -> Result<u16> {
    let trimmed = name.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidCellRef(name.to_string()));
    }

    let mut n: u32 = 0;
    for c in trimmed.chars() {
        n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if n > u32::from(u16::MAX) {
            return Err(Error::InvalidCellRef(name.to_string()));
        }
    }

    u16::try_from(n - 1).map_err(|_| Error::InvalidCellRef(name.to_string()))
}

/// Parse an A1 reference into a 0-based (row, col) pair
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u16)> {
    let trimmed = reference.trim().replace('$', "");
    let split = trimmed
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| Error::InvalidCellRef(reference.to_string()))?;
    let (letters, digits) = trimmed.split_at(split);

    let col = column_index(letters).map_err(|_| Error::InvalidCellRef(reference.to_string()))?;
    let row: u32 = digits
        .parse()
        .map_err(|_| Error::InvalidCellRef(reference.to_string()))?;
    if row == 0 {
        return Err(Error::InvalidCellRef(reference.to_string()));
    }

    Ok((row - 1, col))
}

/// Format a 0-based (row, col) pair as an A1 reference
pub fn cell_ref(row: u32, col: u16) -> String {
    format!("{}{}", column_name(col), row + 1)
}
