//! Dense CSV loading
//!
//! Every non-empty line is one point and every comma separated field one
//! coordinate. A header row is detected and skipped automatically, and lines
//! starting with `#` are comments.

use crate::core::{Dataset, FastMksError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl Dataset {
    /// Load a dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader, detecting a header row
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_csv_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_csv_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut first_data_line = true;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first_data_line {
                first_data_line = false;
                if auto_detect_header && is_header_line(line) {
                    continue;
                }
            }

            let row = parse_data_line(line, number + 1)?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(FastMksError::ParseError(format!(
                        "Line {} has {} fields, expected {}",
                        number + 1,
                        row.len(),
                        first.len()
                    )));
                }
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(FastMksError::InvalidArgument(
                "CSV input holds no data rows".to_string(),
            ));
        }
        Self::from_rows(rows)
    }
}

/// Check if a line appears to be a header: most fields are not numbers
fn is_header_line(line: &str) -> bool {
    let fields: Vec<&str> = line.split(',').collect();
    let non_numeric = fields
        .iter()
        .filter(|field| field.trim().parse::<f64>().is_err())
        .count();
    non_numeric * 2 > fields.len()
}

fn parse_data_line(line: &str, number: usize) -> Result<Vec<f64>> {
    line.split(',')
        .enumerate()
        .map(|(column, field)| {
            let field = field.trim();
            field.parse::<f64>().map_err(|_| {
                FastMksError::ParseError(format!(
                    "Invalid value at line {number}, column {}: {field:?}",
                    column + 1
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_basic() {
        let data = "1.0,2.0,3.0\n4.0,5.0,6.0\n";
        let dataset = Dataset::from_csv_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 3);
        assert_eq!(dataset.point(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_csv_with_headers() {
        let data = "x,y\n1.0,2.0\n3.0,4.0\n";
        let dataset = Dataset::from_csv_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2); // Headers should be skipped
        assert_eq!(dataset.point(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_csv_empty_lines_and_comments() {
        let data = "# Comment\n1.0, 2.0\n\n  3.0,-4.5  \n# trailing\n";
        let dataset = Dataset::from_csv_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.point(1), &[3.0, -4.5]);
    }

    #[test]
    fn test_csv_single_column() {
        let data = "1\n2\n3\n";
        let dataset = Dataset::from_csv_reader(Cursor::new(data)).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.dim(), 1);
    }

    #[test]
    fn test_csv_invalid_format() {
        // Invalid number after the first row
        let result = Dataset::from_csv_reader(Cursor::new("1.0,2.0\n1.0,abc\n"));
        assert!(matches!(result, Err(FastMksError::ParseError(_))));

        // Ragged rows
        let result = Dataset::from_csv_reader(Cursor::new("1.0,2.0\n1.0\n"));
        assert!(matches!(result, Err(FastMksError::ParseError(_))));

        // Nothing but a header
        let result = Dataset::from_csv_reader(Cursor::new("a,b\n"));
        assert!(matches!(result, Err(FastMksError::InvalidArgument(_))));
    }

    #[test]
    fn test_csv_manual_header_control() {
        let result = Dataset::from_csv_reader_with_options(Cursor::new("a,b\n1,2\n"), false);
        assert!(matches!(result, Err(FastMksError::ParseError(_))));
    }

    #[test]
    fn test_is_header_line() {
        assert!(is_header_line("feature1,feature2,label"));
        assert!(is_header_line("x"));
        assert!(!is_header_line("1.0,2.0,3.0"));
        assert!(!is_header_line("1.0,2.0,name"));
    }

    #[test]
    fn test_csv_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "0.5,1.5").expect("Failed to write");
        writeln!(file, "-0.5,2.5").expect("Failed to write");
        file.flush().expect("Failed to flush");

        let dataset = Dataset::from_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);

        assert!(matches!(
            Dataset::from_csv("/nonexistent/points.csv"),
            Err(FastMksError::IoError(_))
        ));
    }
}
