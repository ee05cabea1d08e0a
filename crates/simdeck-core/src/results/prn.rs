//! Xyce `.prn` tables

use std::path::Path;

use num_complex::Complex64;

use super::{is_axis_type, parse_number, Plot, SampleMatrix, Variable};
use crate::error::{Error, Result};

/// A value column: real, or a fused `Re(x)`/`Im(x)` pair
#[derive(Debug)]
enum Source {
    Real(usize),
    Complex(usize, usize),
}

fn fuse_columns(header: &[&str]) -> Vec<(String, Source)> {
    let mut columns = Vec::new();
    let mut i = 0;
    while i < header.len() {
        let name = header[i];
        let inner = |prefix: &str, text: &str| {
            text.get(..3)
                .filter(|p| p.eq_ignore_ascii_case(prefix))
                .and_then(|_| text[3..].strip_suffix(')'))
                .map(str::to_string)
        };
        if let (Some(re), Some(im)) = (
            inner("re(", name),
            header.get(i + 1).and_then(|next| inner("im(", next)),
        ) {
            if re == im {
                columns.push((re, Source::Complex(i, i + 1)));
                i += 2;
                continue;
            }
        }
        columns.push((name.to_string(), Source::Real(i)));
        i += 1;
    }
    columns
}

fn build_plot(name: &str, columns: &[(String, Source)], rows: Vec<Vec<f64>>) -> Plot {
    let complex = columns.iter().any(|(_, s)| matches!(s, Source::Complex(..)));
    let variables: Vec<Variable> = columns
        .iter()
        .map(|(n, _)| Variable::new(n.clone(), ""))
        .collect();
    let has_axis = columns.first().is_some_and(|(n, _)| is_axis_type(n)) || rows.len() > 1;

    let samples = if complex {
        SampleMatrix::Complex(
            rows.iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|(_, s)| match *s {
                            Source::Real(i) => Complex64::new(row[i], 0.0),
                            Source::Complex(r, m) => Complex64::new(row[r], row[m]),
                        })
                        .collect()
                })
                .collect(),
        )
    } else {
        SampleMatrix::Real(
            rows.iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|(_, s)| match *s {
                            Source::Real(i) | Source::Complex(i, _) => row[i],
                        })
                        .collect()
                })
                .collect(),
        )
    };
    Plot {
        title: String::new(),
        name: name.to_string(),
        variables,
        samples,
        has_axis,
    }
}

/// Parse a `.prn` table.
///
/// The `Index` column is dropped; an index that restarts at 0 begins a new
/// plot (one per parametric step).
pub fn parse_prn(text: &str, name: &str, path: &Path) -> Result<Vec<Plot>> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| Error::result_format(path, "empty table"))?;
    let header: Vec<&str> = header_line.split_whitespace().collect();
    let indexed = header
        .first()
        .is_some_and(|h| h.eq_ignore_ascii_case("index"));
    let value_names = if indexed { &header[1..] } else { &header[..] };
    let columns = fuse_columns(value_names);

    let mut plots = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.starts_with("End of Xyce") {
            break;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != header.len() {
            return Err(Error::result_format(
                path,
                format!(
                    "row {} has {} fields, header has {}",
                    line_no + 1,
                    fields.len(),
                    header.len()
                ),
            ));
        }
        let values: Vec<f64> = fields
            .iter()
            .map(|f| parse_number(f))
            .collect::<Option<_>>()
            .ok_or_else(|| Error::result_format(path, format!("non-numeric row '{line}'")))?;

        if indexed && values[0] == 0.0 && !rows.is_empty() {
            plots.push(build_plot(name, &columns, std::mem::take(&mut rows)));
        }
        let start = usize::from(indexed);
        rows.push(values[start..].to_vec());
    }
    if !rows.is_empty() || plots.is_empty() {
        plots.push(build_plot(name, &columns, rows));
    }
    Ok(plots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Column;

    #[test]
    fn test_complex_columns_fused() {
        let text = "Index   FREQ   Re(V(OUT))   Im(V(OUT))  V(IN)\n\
                    0   1.0e+03   0.5   -0.5   1.0\n\
                    1   1.0e+04   0.1   -0.2   1.0\n\
                    End of Xyce(TM) Simulation\n";
        let plots = parse_prn(text, "ac", Path::new("rc.cir.FD.prn")).unwrap();
        assert_eq!(plots.len(), 1);
        let plot = &plots[0];
        assert_eq!(plot.names(), vec!["FREQ", "V(OUT)", "V(IN)"]);
        assert!(plot.is_complex());
        assert!(plot.has_axis);
        assert_eq!(
            plot.column("V(OUT)"),
            Some(Column::Complex(vec![Complex64::new(0.5, -0.5), Complex64::new(0.1, -0.2)]))
        );
        assert_eq!(plot.column("FREQ").unwrap().real(), vec![1e3, 1e4]);
    }

    #[test]
    fn test_index_reset_starts_a_step() {
        let text = "Index TIME V(A)\n0 0 1\n1 1e-3 2\n0 0 3\n1 1e-3 4\nEnd of Xyce(TM) Parameter Sweep\n";
        let plots = parse_prn(text, "tran", Path::new("t.prn")).unwrap();
        assert_eq!(plots.len(), 2);
        assert!(plots[0].same_layout(&plots[1]));
        assert_eq!(plots[1].samples, SampleMatrix::Real(vec![vec![0.0, 3.0], vec![1e-3, 4.0]]));
    }

    #[test]
    fn test_single_row_is_scalar() {
        let text = "Index V(OUT) d(V(OUT))/d(R1:R)\n0 2.5 -1.25e-3\nEnd of Xyce(TM) Simulation\n";
        let plots = parse_prn(text, "sens", Path::new("s.prn")).unwrap();
        assert!(!plots[0].has_axis);
        assert_eq!(plots[0].names(), vec!["V(OUT)", "d(V(OUT))/d(R1:R)"]);
    }

    #[test]
    fn test_ragged_row_is_error() {
        let text = "Index TIME V(A)\n0 0 1\n1 1e-3\n";
        let err = parse_prn(text, "tran", Path::new("t.prn")).unwrap_err();
        assert!(err.to_string().contains("row 2 has 2 fields, header has 3"), "{err}");
    }
}
