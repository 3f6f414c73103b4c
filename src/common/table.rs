//! Spreadsheet cell addressing.
//!
//! `TablePosition` maps between 0-based (row, col) pairs and the `A1`-style
//! references used by spreadsheet formats. Column letters are base-26 using
//! `A`–`Z`; rows are 1-based decimal in the string form.

use crate::common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A 0-based cell position inside a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TablePosition {
    row: u32,
    col: u32,
}

impl TablePosition {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Parse a column letter run (`"A"` → 0, `"Z"` → 25, `"AA"` → 26).
    ///
    /// Case-insensitive; fails on empty input or non-letter characters.
    pub fn to_col_num(s: &str) -> Result<u32> {
        if s.is_empty() {
            return Err(Error::MalformedStructure(
                "empty column reference".to_string(),
            ));
        }
        let mut col: u32 = 0;
        for c in s.chars() {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return Err(Error::MalformedStructure(format!(
                    "invalid column character in {s:?}"
                )));
            }
            col = col
                .checked_mul(26)
                .and_then(|v| v.checked_add(c as u32 - 'A' as u32 + 1))
                .ok_or_else(|| {
                    Error::MalformedStructure(format!("column reference out of range: {s:?}"))
                })?;
        }
        Ok(col - 1)
    }

    /// Encode a 0-based column number as letters (`0` → `"A"`, `26` → `"AA"`).
    pub fn to_col_string(col: u32) -> String {
        // Widened so col == u32::MAX cannot overflow the bias.
        let mut n = u64::from(col) + 1;
        let mut buf = Vec::new();
        while n > 0 {
            n -= 1;
            buf.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        buf.reverse();
        // Only ASCII letters are pushed above.
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl fmt::Display for TablePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::to_col_string(self.col), u64::from(self.row) + 1)
    }
}

impl FromStr for TablePosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::MalformedStructure(format!("missing row number in {s:?}")))?;
        let (letters, digits) = s.split_at(split);
        let col = Self::to_col_num(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::MalformedStructure(format!("invalid row number in {s:?}")))?;
        if row == 0 {
            return Err(Error::MalformedStructure(format!(
                "row numbers are 1-based: {s:?}"
            )));
        }
        Ok(Self { row: row - 1, col })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_corner_positions() {
        assert_eq!("A1".parse::<TablePosition>().unwrap(), TablePosition::new(0, 0));
        assert_eq!("Z1".parse::<TablePosition>().unwrap(), TablePosition::new(0, 25));
        assert_eq!("AA1".parse::<TablePosition>().unwrap(), TablePosition::new(0, 26));
        assert_eq!("B7".parse::<TablePosition>().unwrap(), TablePosition::new(6, 1));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            "aa12".parse::<TablePosition>().unwrap(),
            "AA12".parse::<TablePosition>().unwrap()
        );
    }

    #[test]
    fn test_rejects_invalid() {
        assert!("".parse::<TablePosition>().is_err());
        assert!("A0".parse::<TablePosition>().is_err());
        assert!("17".parse::<TablePosition>().is_err());
        assert!("A".parse::<TablePosition>().is_err());
        assert!("1A".parse::<TablePosition>().is_err());
    }

    #[test]
    fn test_col_string() {
        assert_eq!(TablePosition::to_col_string(0), "A");
        assert_eq!(TablePosition::to_col_string(25), "Z");
        assert_eq!(TablePosition::to_col_string(26), "AA");
        assert_eq!(TablePosition::to_col_string(701), "ZZ");
        assert_eq!(TablePosition::to_col_string(702), "AAA");
    }

    #[test]
    fn test_extreme_components_do_not_overflow() {
        let s = TablePosition::new(u32::MAX, u32::MAX).to_string();
        assert!(s.ends_with("4294967296"));
        // 4294967296 columns need seven letters in bijective base 26.
        assert_eq!(TablePosition::to_col_string(u32::MAX).len(), 7);
    }

    proptest! {
        #[test]
        fn roundtrip_position(row in 0u32..1_000_000, col in 0u32..20_000) {
            let pos = TablePosition::new(row, col);
            let parsed: TablePosition = pos.to_string().parse().unwrap();
            prop_assert_eq!(parsed, pos);
        }

        #[test]
        fn roundtrip_string(s in "[A-Z]{1,3}[1-9][0-9]{0,5}") {
            let pos: TablePosition = s.parse().unwrap();
            prop_assert_eq!(pos.to_string(), s);
        }
    }
}
