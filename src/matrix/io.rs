//! Whitespace-separated matrix text format.
//!
//! A matrix is an integer width `N` followed by `N * N` floating point values in
//! row-major order. Files may carry several matrices back to back; some omit the
//! width for every matrix after the first, so widths and values are read
//! separately.

use std::io::{self, BufRead, Write};

/// Values reserved up front; larger matrices grow as their values arrive.
const PREALLOC_VALUES: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected end of input: read {read} of {expected} values")]
    UnexpectedEof { read: usize, expected: usize },

    #[error("could not parse {token:?} as {what}")]
    BadToken { token: String, what: &'static str },

    #[error("matrix width must be positive, found {0}")]
    BadWidth(i64),

    #[error("a {0}x{0} matrix does not fit in memory")]
    TooLarge(usize),
}

/// Token reader over any buffered source.
pub struct MatrixReader<R> {
    source: R,
    line: String,
    pending: Vec<String>,
}

impl<R: BufRead> MatrixReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            line: String::new(),
            pending: Vec::new(),
        }
    }

    /// Next whitespace-delimited token, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<String>, FormatError> {
        while self.pending.is_empty() {
            self.line.clear();
            if self.source.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            // reversed so pop() yields tokens in order
            self.pending = self.line.split_whitespace().rev().map(str::to_owned).collect();
        }
        Ok(self.pending.pop())
    }

    pub fn read_width(&mut self) -> Result<usize, FormatError> {
        let token = self
            .next_token()?
            .ok_or(FormatError::UnexpectedEof { read: 0, expected: 1 })?;
        let width: i64 = token.parse().map_err(|_| FormatError::BadToken {
            token: token.clone(),
            what: "a matrix width",
        })?;
        if width <= 0 {
            return Err(FormatError::BadWidth(width));
        }
        usize::try_from(width).map_err(|_| FormatError::BadWidth(width))
    }

    /// Reads `width * width` values.
    ///
    /// Fails with `TooLarge` when the matrix could not be addressed at all.
    pub fn read_matrix(&mut self, width: usize) -> Result<Vec<f64>, FormatError> {
        let expected = width
            .checked_mul(width)
            .filter(|&n| {
                n.checked_mul(size_of::<f64>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(FormatError::TooLarge(width))?;
        let mut values = Vec::with_capacity(expected.min(PREALLOC_VALUES));
        while values.len() < expected {
            let token = self.next_token()?.ok_or(FormatError::UnexpectedEof {
                read: values.len(),
                expected,
            })?;
            let value: f64 = token.parse().map_err(|_| FormatError::BadToken {
                token,
                what: "a floating point value",
            })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Reads a width followed by its matrix.
    pub fn read_square(&mut self) -> Result<(usize, Vec<f64>), FormatError> {
        let width = self.read_width()?;
        let values = self.read_matrix(width)?;
        Ok((width, values))
    }

    /// True once only whitespace remains.
    pub fn at_end(&mut self) -> Result<bool, FormatError> {
        match self.next_token()? {
            Some(token) => {
                self.pending.push(token);
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

/// Writes one row per line, values separated by single spaces.
pub fn write_matrix<W: Write>(mut out: W, m: &[f64], width: usize) -> io::Result<()> {
    if width == 0 {
        return Ok(());
    }
    for row in m.chunks(width) {
        let mut first = true;
        for value in row {
            if !first {
                out.write_all(b" ")?;
            }
            write!(out, "{value}")?;
            first = false;
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_two_matrices_after_one_width() {
        let text = "2\n1 2\n3 4\n5.5 6\n7 8e1\n";
        let mut reader = MatrixReader::new(text.as_bytes());
        let (width, a) = reader.read_square().unwrap();
        let b = reader.read_matrix(width).unwrap();
        assert_eq!(width, 2);
        assert_eq!(a, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(b, vec![5.5, 6.0, 7.0, 80.0]);
        assert!(reader.at_end().unwrap());
    }

    #[test]
    fn values_may_span_lines_arbitrarily() {
        let text = "3 1 2\n3 4 5 6 7\n\n8\n9";
        let mut reader = MatrixReader::new(text.as_bytes());
        let (_, m) = reader.read_square().unwrap();
        assert_eq!(m, (1..=9).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn truncated_matrix_reports_progress() {
        let mut reader = MatrixReader::new("2 1 2 3".as_bytes());
        match reader.read_square() {
            Err(FormatError::UnexpectedEof { read, expected }) => {
                assert_eq!((read, expected), (3, 4));
            }
            other => panic!("expected EOF error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_width_and_values() {
        let mut reader = MatrixReader::new("-3".as_bytes());
        assert!(matches!(reader.read_width(), Err(FormatError::BadWidth(-3))));

        let mut reader = MatrixReader::new("x".as_bytes());
        assert!(matches!(reader.read_width(), Err(FormatError::BadToken { .. })));

        let mut reader = MatrixReader::new("1 abc".as_bytes());
        assert!(matches!(reader.read_square(), Err(FormatError::BadToken { .. })));
    }

    #[test]
    fn oversized_width_is_rejected_before_reading_values() {
        let width = usize::MAX.isqrt() + 1;
        let text = format!("{width} 1 2");
        let mut reader = MatrixReader::new(text.as_bytes());
        match reader.read_square() {
            Err(FormatError::TooLarge(w)) => assert_eq!(w, width),
            other => panic!("expected too-large error, got {other:?}"),
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn huge_but_addressable_width_reports_eof() {
        // 10^10 values; only the two present are ever stored
        let mut reader = MatrixReader::new("100000 1 2".as_bytes());
        match reader.read_square() {
            Err(FormatError::UnexpectedEof { read, expected }) => {
                assert_eq!((read, expected), (2, 10_000_000_000));
            }
            other => panic!("expected EOF error, got {other:?}"),
        }
    }

    #[test]
    fn written_matrix_reads_back() {
        let m = vec![1.25, -2.0, 0.0, 3.5];
        let mut out = Vec::new();
        write_matrix(&mut out, &m, 2).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "1.25 -2\n0 3.5\n");

        let mut reader = MatrixReader::new(out.as_slice());
        assert_eq!(reader.read_matrix(2).unwrap(), m);
    }
}
