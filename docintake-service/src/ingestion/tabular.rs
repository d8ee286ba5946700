//! CSV files rendered as an aligned plain-text table.

use std::path::Path;

use crate::error::{ProcessingError, ServiceResult};

/// Read a CSV file and render header and rows with padded columns.
pub fn extract_csv(path: &Path) -> ServiceResult<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(|field| field.trim().to_string()).collect());
    }

    Ok(render_table(&rows))
}

fn csv_error(e: csv::Error) -> ProcessingError {
    ProcessingError::TextExtraction {
        page: 0,
        source: Box::new(e),
    }
}

/// Left-align every column to its widest cell, separated by two spaces.
/// Trailing padding is stripped from each line.
fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let line = row
                .iter()
                .enumerate()
                .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ");
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_aligns_columns() {
        let rows = vec![
            vec!["name".to_string(), "amount".to_string()],
            vec!["Widget".to_string(), "12.50".to_string()],
            vec!["Gear".to_string(), "3".to_string()],
        ];
        assert_eq!(
            render_table(&rows),
            "name    amount\nWidget  12.50\nGear    3"
        );
    }

    #[test]
    fn test_extract_csv_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,label,note\n1,alpha\n22,beta,\"x, y\"\n").unwrap();

        let text = extract_csv(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id  label  note");
        assert_eq!(lines[1], "1   alpha");
        assert_eq!(lines[2], "22  beta   x, y");
    }

    #[test]
    fn test_empty_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert_eq!(extract_csv(&path).unwrap(), "");
    }
}
