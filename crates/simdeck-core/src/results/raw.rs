//! SPICE raw files, binary and ASCII.
//!
//! A file is a sequence of plots. Each plot is an ASCII header
//! (`Title:`, `Plotname:`, `Flags:`, `No. Variables:`, `No. Points:`,
//! `Variables:`) closed by `Binary:` or `Values:`, followed by the samples.

use std::fs;
use std::path::Path;

use num_complex::Complex64;

use super::{is_axis_type, parse_number, Plot, SampleMatrix, Variable};
use crate::config::ByteOrder;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Header {
    title: String,
    plotname: String,
    flags: String,
    num_variables: usize,
    num_points: usize,
    variables: Vec<Variable>,
    binary: bool,
}

impl Header {
    fn is_complex(&self) -> bool {
        self.flags.to_ascii_lowercase().contains("complex")
    }

    fn sample_width(&self) -> usize {
        if self.flags.to_ascii_lowercase().contains("float") {
            4
        } else {
            8
        }
    }

    fn has_axis(&self) -> bool {
        let first = self.variables.first().map(|v| v.kind.as_str()).unwrap_or("");
        is_axis_type(first)
            || (self.num_points > 1 && !self.plotname.to_ascii_lowercase().contains("operating point"))
    }
}

/// Byte cursor over the whole file
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.data[self.pos..].iter().all(|b| b.is_ascii_whitespace())
    }

    /// Next line without its terminator
    fn line(&mut self) -> Option<String> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        Some(
            String::from_utf8_lossy(&rest[..end])
                .trim_end_matches('\r')
                .to_string(),
        )
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::result_format(self.path, reason)
    }

    fn header(&mut self) -> Result<Header> {
        let mut header = Header::default();
        loop {
            let Some(line) = self.line() else {
                return Err(self.error("header ends before Binary:/Values:"));
            };
            let line = line.trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Title" => header.title = value.to_string(),
                "Plotname" => header.plotname = value.to_string(),
                "Flags" => header.flags = value.to_string(),
                "No. Variables" => header.num_variables = self.count(key, value)?,
                "No. Points" => header.num_points = self.count(key, value)?,
                "Variables" => {
                    let mut pending = (!value.is_empty()).then(|| value.to_string());
                    while header.variables.len() < header.num_variables {
                        let line = match pending.take() {
                            Some(l) => l,
                            None => self
                                .line()
                                .ok_or_else(|| self.error("variable list is truncated"))?,
                        };
                        let fields: Vec<&str> = line.split_whitespace().collect();
                        if fields.len() < 2 {
                            continue;
                        }
                        header.variables.push(Variable::new(
                            fields[1],
                            fields.get(2).copied().unwrap_or(""),
                        ));
                    }
                }
                "Binary" => {
                    header.binary = true;
                    return Ok(header);
                }
                "Values" => return Ok(header),
                _ => {}
            }
        }
    }

    fn count(&self, key: &str, value: &str) -> Result<usize> {
        value
            .parse()
            .map_err(|_| self.error(format!("invalid {key}: '{value}'")))
    }

    fn binary(&mut self, header: &Header, order: ByteOrder) -> Result<SampleMatrix> {
        let width = header.sample_width();
        let per_value = if header.is_complex() { 2 * width } else { width };
        let needed = header
            .num_points
            .checked_mul(header.num_variables)
            .and_then(|n| n.checked_mul(per_value))
            .ok_or_else(|| {
                self.error(format!(
                    "{} points of {} variables exceed the addressable size",
                    header.num_points, header.num_variables
                ))
            })?;
        let available = self.data.len() - self.pos;
        if available < needed {
            return Err(self.error(format!(
                "{} points of {} variables need {needed} bytes, found {available}",
                header.num_points, header.num_variables
            )));
        }

        let bytes = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        let mut values = bytes.chunks_exact(width).map(|c| read_sample(c, order));
        let mut next = || values.next().unwrap_or(0.0);

        let n = header.num_variables;
        Ok(if header.is_complex() {
            SampleMatrix::Complex(
                (0..header.num_points)
                    .map(|_| (0..n).map(|_| Complex64::new(next(), next())).collect())
                    .collect(),
            )
        } else {
            SampleMatrix::Real(
                (0..header.num_points)
                    .map(|_| (0..n).map(|_| next()).collect())
                    .collect(),
            )
        })
    }

    fn ascii(&mut self, header: &Header) -> Result<SampleMatrix> {
        // Declared counts are untrusted; rows grow as they are read
        let mut rows = Vec::new();
        for point in 0..header.num_points {
            let mut row = Vec::new();
            while row.len() < header.num_variables {
                let line = self.line().ok_or_else(|| {
                    self.error(format!(
                        "expected {} points, data ends in point {point}",
                        header.num_points
                    ))
                })?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // The first value of a point follows the point index
                let text = if row.is_empty() {
                    line.split_whitespace().last().unwrap_or("")
                } else {
                    line
                };
                let value = parse_ascii_sample(text).ok_or_else(|| {
                    self.error(format!("invalid sample '{text}' in point {point}"))
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        Ok(if header.is_complex() {
            SampleMatrix::Complex(rows)
        } else {
            SampleMatrix::Real(rows.into_iter().map(|r| r.into_iter().map(|c| c.re).collect()).collect())
        })
    }
}

fn read_sample(bytes: &[u8], order: ByteOrder) -> f64 {
    match (bytes.len(), order) {
        (4, ByteOrder::Little) => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (4, ByteOrder::Big) => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        (_, order) => {
            let array: [u8; 8] = bytes[..8].try_into().unwrap_or([0; 8]);
            match order {
                ByteOrder::Little => f64::from_le_bytes(array),
                ByteOrder::Big => f64::from_be_bytes(array),
            }
        }
    }
}

/// `1.5`, `1.5,0.2` or `(1.5,0.2)`
fn parse_ascii_sample(text: &str) -> Option<Complex64> {
    let text = text.trim().trim_start_matches('(').trim_end_matches(')');
    match text.split_once(',') {
        Some((re, im)) => Some(Complex64::new(parse_number(re)?, parse_number(im)?)),
        None => parse_number(text).map(|re| Complex64::new(re, 0.0)),
    }
}

/// Decode every plot in a raw file
pub fn parse_raw(data: &[u8], order: ByteOrder, path: &Path) -> Result<Vec<Plot>> {
    let mut cursor = Cursor { data, pos: 0, path };
    let mut plots = Vec::new();

    while !cursor.at_end() {
        let header = cursor.header()?;
        if header.variables.len() != header.num_variables {
            return Err(cursor.error(format!(
                "declared {} variables, listed {}",
                header.num_variables,
                header.variables.len()
            )));
        }
        let samples = if header.binary {
            cursor.binary(&header, order)?
        } else {
            cursor.ascii(&header)?
        };
        log::debug!(
            "raw plot '{}': {} variables, {} points",
            header.plotname,
            header.num_variables,
            header.num_points
        );
        plots.push(Plot {
            has_axis: header.has_axis(),
            title: header.title,
            name: header.plotname,
            variables: header.variables,
            samples,
        });
    }

    if plots.is_empty() {
        return Err(cursor.error("no plots"));
    }
    Ok(plots)
}

pub fn read_raw(path: &Path, order: ByteOrder) -> Result<Vec<Plot>> {
    let data = fs::read(path)?;
    parse_raw(&data, order, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Column;

    const AC_HEADER: &str = "Title: rc\nDate: Thu Jan  1 00:00:00 2026\nPlotname: AC Analysis\nFlags: complex\nNo. Variables: 2\nNo. Points: 2\nVariables:\n\t0\tfrequency\tfrequency grid=3\n\t1\tv(out)\tvoltage\n";

    fn ac_binary(order: ByteOrder) -> Vec<u8> {
        let mut data = format!("{AC_HEADER}Binary:\n").into_bytes();
        for v in [1e3, 0.0, 0.9, -0.1, 1e4, 0.0, 0.5, -0.5] {
            match order {
                ByteOrder::Little => data.extend_from_slice(&f64::to_le_bytes(v)),
                ByteOrder::Big => data.extend_from_slice(&f64::to_be_bytes(v)),
            }
        }
        data
    }

    #[test]
    fn test_binary_and_ascii_decode_alike() {
        let ascii = format!(
            "{AC_HEADER}Values:\n 0\t1.000000000000000e+03,0.000000000000000e+00\n\t9.000000000000000e-01,-1.000000000000000e-01\n\n 1\t1.000000000000000e+04,0.0\n\t5.000000000000000e-01,-5.000000000000000e-01\n"
        );
        let path = Path::new("rc.raw");
        let from_ascii = parse_raw(ascii.as_bytes(), ByteOrder::Little, path).unwrap();
        let from_binary = parse_raw(&ac_binary(ByteOrder::Little), ByteOrder::Little, path).unwrap();
        assert_eq!(from_ascii, from_binary);

        let plot = &from_binary[0];
        assert_eq!(plot.names(), vec!["frequency", "v(out)"]);
        assert!(plot.is_complex());
        assert!(plot.has_axis);
        assert_eq!(
            plot.column("v(out)"),
            Some(Column::Complex(vec![Complex64::new(0.9, -0.1), Complex64::new(0.5, -0.5)]))
        );
    }

    #[test]
    fn test_big_endian() {
        let plots = parse_raw(&ac_binary(ByteOrder::Big), ByteOrder::Big, Path::new("x")).unwrap();
        assert_eq!(plots[0].column("frequency").unwrap().real(), vec![1e3, 1e4]);
    }

    #[test]
    fn test_consecutive_plots() {
        let raw = "Title: amp\nPlotname: Noise Spectral Density Curves\nFlags: real\nNo. Variables: 2\nNo. Points: 2\nVariables:\n\t0\tfrequency\tfrequency\n\t1\tonoise_spectrum\tnoise\nValues:\n0\t10\n\t1e-8\n1\t100\n\t2e-8\nTitle: amp\nPlotname: Integrated Noise\nFlags: real\nNo. Variables: 2\nNo. Points: 1\nVariables:\n\t0\tonoise_total\tnoise\n\t1\tinoise_total\tnoise\nValues:\n0\t3e-6\n\t4e-7\n";
        let plots = parse_raw(raw.as_bytes(), ByteOrder::Little, Path::new("n.raw")).unwrap();
        assert_eq!(plots.len(), 2);
        assert!(plots[0].has_axis);
        assert!(!plots[1].has_axis);
        assert_eq!(plots[1].samples, SampleMatrix::Real(vec![vec![3e-6, 4e-7]]));
    }

    #[test]
    fn test_float_samples() {
        let mut data = b"Title: t\nPlotname: Transient Analysis\nFlags: real float\nNo. Variables: 2\nNo. Points: 1\nVariables:\n 0 time time\n 1 v(a) voltage\nBinary:\n".to_vec();
        data.extend_from_slice(&0.5f32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());
        let plots = parse_raw(&data, ByteOrder::Little, Path::new("t.raw")).unwrap();
        assert_eq!(plots[0].samples, SampleMatrix::Real(vec![vec![0.5, 2.0]]));
        assert!(plots[0].has_axis);
    }

    #[test]
    fn test_count_mismatch_is_format_error() {
        let mut data = ac_binary(ByteOrder::Little);
        data.truncate(data.len() - 8);
        let err = parse_raw(&data, ByteOrder::Little, Path::new("rc.raw")).unwrap_err();
        assert!(err.to_string().contains("need 64 bytes, found 56"), "{err}");

        let ascii = format!("{AC_HEADER}Values:\n 0\t1e3,0\n\t0.9,-0.1\n");
        let err = parse_raw(ascii.as_bytes(), ByteOrder::Little, Path::new("rc.raw")).unwrap_err();
        assert!(matches!(err, Error::ResultFormat { .. }));
    }

    #[test]
    fn test_oversized_declared_counts_are_format_errors() {
        let header = "Title: t\nPlotname: Transient Analysis\nFlags: real\nNo. Variables: 2\nVariables:\n 0 time time\n 1 v(a) voltage\n";

        let binary = format!("No. Points: 9223372036854775807\n{header}Binary:\n\0\0\0\0");
        let err = parse_raw(binary.as_bytes(), ByteOrder::Little, Path::new("t.raw")).unwrap_err();
        assert!(matches!(err, Error::ResultFormat { .. }), "{err}");

        let ascii = format!("No. Points: 18446744073709551615\n{header}Values:\n0\t0.0\n\t1.0\n");
        let err = parse_raw(ascii.as_bytes(), ByteOrder::Little, Path::new("t.raw")).unwrap_err();
        assert!(err.to_string().contains("data ends in point 1"), "{err}");
    }
}
