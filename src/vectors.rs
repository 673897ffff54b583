/// Per-gene numeric vectors (z-index anchors, model predictions)
///
/// Files are tab-delimited, one row per gene; a column can be selected,
/// defaulting to the last one.
use crate::error::{Result, RiboError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub fn read_column<P: AsRef<Path>>(path: P, column: Option<usize>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RiboError::open(path, e))?;
    parse_column(BufReader::new(file), path, column)
}

pub fn parse_column<R: BufRead>(reader: R, source: &Path, column: Option<usize>) -> Result<Vec<f64>> {
    Ok(parse_rows(reader, source, column)?
        .into_iter()
        .map(|(_, v)| v)
        .collect())
}

/// Selected values with their 1-based file line numbers
fn parse_rows<R: BufRead>(reader: R, source: &Path, column: Option<usize>) -> Result<Vec<(usize, f64)>> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let idx = column.unwrap_or(fields.len() - 1);
        let field = fields.get(idx).ok_or_else(|| {
            RiboError::parse(
                source,
                i + 1,
                format!("column {idx} requested but line has {} columns", fields.len()),
            )
        })?;
        let value: f64 = field.trim().parse().map_err(|_| {
            RiboError::parse(source, i + 1, format!("invalid number '{}'", field.trim()))
        })?;
        rows.push((i + 1, value));
    }
    Ok(rows)
}

/// Anchors are codon indices; values written as floats must still be integral
pub fn read_z_index<P: AsRef<Path>>(path: P, column: Option<usize>) -> Result<Vec<i64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RiboError::open(path, e))?;
    parse_z_index(BufReader::new(file), path, column)
}

pub fn parse_z_index<R: BufRead>(reader: R, source: &Path, column: Option<usize>) -> Result<Vec<i64>> {
    parse_rows(reader, source, column)?
        .into_iter()
        .map(|(line, v)| {
            if v.fract() != 0.0 || !v.is_finite() {
                Err(RiboError::parse(
                    source,
                    line,
                    format!("z-index {v} is not an integer"),
                ))
            } else {
                Ok(v as i64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_column_default() {
        let text = "0\t0.25\n1\t0.75\n\n2\t1e-1\n";
        let v = parse_column(text.as_bytes(), Path::new("p"), None).unwrap();
        assert_eq!(v, vec![0.25, 0.75, 0.1]);
        let first = parse_column(text.as_bytes(), Path::new("p"), Some(0)).unwrap();
        assert_eq!(first, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_column_errors() {
        let text = "0.5\n";
        assert!(parse_column(text.as_bytes(), Path::new("p"), Some(1)).is_err());
        let text = "abc\n";
        assert!(parse_column(text.as_bytes(), Path::new("p"), None).is_err());
    }

    #[test]
    fn test_z_index_integral() {
        let text = "3\t40\n4\t41.0\n";
        assert_eq!(
            parse_z_index(text.as_bytes(), Path::new("z"), None).unwrap(),
            vec![40, 41]
        );
        let text = "40.5\n";
        assert!(parse_z_index(text.as_bytes(), Path::new("z"), None).is_err());
    }

    #[test]
    fn test_z_index_error_names_file_line() {
        let text = "# anchors\n\n40\n40.5\n";
        match parse_z_index(text.as_bytes(), Path::new("z"), None) {
            Err(RiboError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
