//! Byte counts with human-readable formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A number of bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub u64);

impl Size {
    /// Raw byte count
    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = self.0 as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        let rendered = if unit_index == 0 {
            format!("{} {}", self.0, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        };
        // Honor width/alignment so log lines can right-align sizes
        f.pad(&rendered)
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size(self.0 + rhs.0)
    }
}

impl Sum for Size {
    fn sum<I: Iterator<Item = Size>>(iter: I) -> Size {
        iter.fold(Size(0), Add::add)
    }
}

impl From<u64> for Size {
    fn from(bytes: u64) -> Self {
        Size(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_formatting() {
        assert_eq!(Size(0).to_string(), "0 B");
        assert_eq!(Size(1023).to_string(), "1023 B");
        assert_eq!(Size(1536).to_string(), "1.5 KB");
        assert_eq!(
            Size(1024 * 1024 * 1024 + 512 * 1024 * 1024).to_string(),
            "1.5 GB"
        );
    }

    #[test]
    fn test_size_padding() {
        assert_eq!(format!("{:>7}", Size(10)), "   10 B");
    }

    #[test]
    fn test_size_sum() {
        let total: Size = [Size(1), Size(2), Size(3)].into_iter().sum();
        assert_eq!(total, Size(6));
    }
}
