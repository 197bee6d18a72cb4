//! Parse a NumPy `.npy` file holding a 2-D `uint8` array, as published by the
//! QuickDraw `numpy_bitmap` dataset (one flattened 28×28 doodle per row).
//!
//! # Layout
//! ```text
//! bytes 0-5:   0x93 'N' 'U' 'M' 'P' 'Y'
//! byte  6:     major version (1, 2 or 3)
//! byte  7:     minor version
//! v1:          bytes 8-9   header length, little-endian u16
//! v2/v3:       bytes 8-11  header length, little-endian u32
//! header:      Python dict literal, e.g.
//!              {'descr': '|u1', 'fortran_order': False, 'shape': (1000, 784), }
//! data:        rows * cols bytes, row-major
//! ```

use crate::error::{Error, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Borrowed view of a 2-D `uint8` array inside an `.npy` buffer.
#[derive(Debug, Clone, Copy)]
pub struct NpyMatrix<'a> {
    pub rows: usize,
    pub cols: usize,
    data: &'a [u8],
}

impl<'a> NpyMatrix<'a> {
    pub fn row(&self, i: usize) -> &'a [u8] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidNpy(msg.into())
}

pub fn parse_npy_u8(bytes: &[u8]) -> Result<NpyMatrix<'_>> {
    // ── Preamble ────────────────────────────────────────────────────────────

    if bytes.len() < 10 {
        return Err(invalid(format!("file too short: {} bytes", bytes.len())));
    }
    if &bytes[0..6] != MAGIC {
        return Err(invalid("missing \\x93NUMPY magic string"));
    }

    let major = bytes[6];
    let (header_len, header_start): (usize, usize) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(invalid("file too short for a v2 header"));
            }
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        other => return Err(invalid(format!("unsupported format version {}", other))),
    };

    let data_start = header_start
        .checked_add(header_len)
        .ok_or_else(|| invalid("header length overflows usize"))?;
    if bytes.len() < data_start {
        return Err(invalid(format!(
            "header declares {} bytes but only {} remain",
            header_len,
            bytes.len() - header_start
        )));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| invalid("header is not valid UTF-8"))?;

    // ── Header dict ─────────────────────────────────────────────────────────

    let descr = quoted_value(header, "descr")?;
    if !matches!(descr, "|u1" | "<u1" | ">u1" | "u1") {
        return Err(invalid(format!("dtype must be uint8, got '{}'", descr)));
    }

    let fortran = raw_value(header, "fortran_order")?;
    if !fortran.starts_with("False") {
        return Err(invalid("Fortran-ordered arrays are not supported"));
    }

    let shape = parse_shape(raw_value(header, "shape")?)?;
    let (rows, cols) = match shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => return Err(invalid(format!("expected a 2-D array, got shape {:?}", other))),
    };

    // ── Data ────────────────────────────────────────────────────────────────

    let n_bytes = rows
        .checked_mul(cols)
        .ok_or_else(|| invalid(format!("rows * cols overflows usize ({} x {})", rows, cols)))?;
    let data = &bytes[data_start..];
    if data.len() < n_bytes {
        return Err(invalid(format!(
            "shape ({}, {}) needs {} data bytes but only {} are present",
            rows, cols, n_bytes, data.len()
        )));
    }

    Ok(NpyMatrix { rows, cols, data: &data[..n_bytes] })
}

/// Encodes a row-major `uint8` matrix as a version 1.0 `.npy` buffer.
pub fn encode_npy_u8(rows: usize, cols: usize, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() != rows * cols {
        return Err(invalid(format!("{} bytes cannot fill a {}x{} array", data.len(), rows, cols)));
    }
    let mut header = format!("{{'descr': '|u1', 'fortran_order': False, 'shape': ({}, {}), }}", rows, cols);
    // Preamble plus header is padded to a multiple of 64 and ends in '\n'.
    let unpadded = 10 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + data.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// Text following `'key':`, with leading whitespace removed.
fn raw_value<'h>(header: &'h str, key: &str) -> Result<&'h str> {
    let pattern = format!("'{}':", key);
    let start = header
        .find(&pattern)
        .ok_or_else(|| invalid(format!("header has no '{}' entry", key)))?;
    Ok(header[start + pattern.len()..].trim_start())
}

fn quoted_value<'h>(header: &'h str, key: &str) -> Result<&'h str> {
    let rest = raw_value(header, key)?;
    let rest = rest
        .strip_prefix('\'')
        .ok_or_else(|| invalid(format!("'{}' is not a string", key)))?;
    let end = rest.find('\'').ok_or_else(|| invalid(format!("unterminated '{}' value", key)))?;
    Ok(&rest[..end])
}

/// Parses a tuple literal such as `(1000, 784)` or `(5,)`.
fn parse_shape(raw: &str) -> Result<Vec<usize>> {
    let inner = raw
        .strip_prefix('(')
        .and_then(|r| r.find(')').map(|end| &r[..end]))
        .ok_or_else(|| invalid("shape is not a tuple"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| invalid(format!("bad shape entry '{}'", s))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_encoded_array() {
        let data: Vec<u8> = (0..12).collect();
        let bytes = encode_npy_u8(3, 4, &data).unwrap();
        // Preamble and header are 64-byte aligned.
        assert_eq!((bytes.len() - data.len()) % 64, 0);

        let m = parse_npy_u8(&bytes).unwrap();
        assert_eq!((m.rows, m.cols), (3, 4));
        assert_eq!(m.row(2), &[8u8, 9, 10, 11]);
    }

    #[test]
    fn reads_version_two_headers() {
        let v1 = encode_npy_u8(2, 3, &[1, 2, 3, 4, 5, 6]).unwrap();
        let header_len = u16::from_le_bytes([v1[8], v1[9]]) as u32;
        let mut v2 = v1[..6].to_vec();
        v2.extend_from_slice(&[2, 0]);
        v2.extend_from_slice(&header_len.to_le_bytes());
        v2.extend_from_slice(&v1[10..]);

        let m = parse_npy_u8(&v2).unwrap();
        assert_eq!((m.rows, m.cols), (2, 3));
        assert_eq!(m.row(1), &[4u8, 5, 6]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode_npy_u8(1, 1, &[0]).unwrap();
        bytes[1] = b'X';
        assert!(matches!(parse_npy_u8(&bytes), Err(Error::InvalidNpy(_))));
    }

    #[test]
    fn rejects_other_dtypes() {
        let mut bytes = encode_npy_u8(1, 2, &[0, 0]).unwrap();
        let pos = bytes.windows(3).position(|w| w == b"|u1").unwrap();
        bytes[pos..pos + 3].copy_from_slice(b"<f8");
        let err = parse_npy_u8(&bytes).unwrap_err();
        assert!(err.to_string().contains("uint8"));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut bytes = encode_npy_u8(2, 2, &[1, 2, 3, 4]).unwrap();
        bytes.pop();
        assert!(parse_npy_u8(&bytes).is_err());
    }

    #[test]
    fn parses_shape_literals() {
        assert_eq!(parse_shape("(5,), }").unwrap(), vec![5]);
        assert_eq!(parse_shape("(10, 784), }").unwrap(), vec![10, 784]);
    }
}
