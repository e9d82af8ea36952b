use std::io::Write;

use crate::estimate::RatioEstimate;
use crate::{Error, Result};

/// Columns every method reports
pub const BASE_COLUMNS: [&str; 6] = ["name", "x", "s[x]", "y", "s[y]", "rho"];

/// One sample's estimate with any method specific values
#[derive(Clone, Debug, PartialEq)]
pub struct RatioRow {
    pub estimate: RatioEstimate,
    pub extra: Vec<f64>,
}

/// Per-sample ratios for a run, in sample order
///
/// The column schema is fixed when the table is created, so every row carries the same
/// method specific columns.
#[derive(Clone, Debug, PartialEq)]
pub struct RatioTable {
    method: String,
    extra_columns: &'static [&'static str],
    rows: Vec<RatioRow>,
}

impl RatioTable {
    pub fn new(method: impl Into<String>, extra_columns: &'static [&'static str]) -> Self {
        Self {
            method: method.into(),
            extra_columns,
            rows: vec![],
        }
    }

    pub(crate) fn with_capacity(
        method: impl Into<String>,
        extra_columns: &'static [&'static str],
        capacity: usize,
    ) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            ..Self::new(method, extra_columns)
        }
    }

    /// Append a row
    ///
    /// # Errors
    /// Returns a configuration error if the extra values do not match the method's columns.
    pub fn push(&mut self, row: RatioRow) -> Result<()> {
        if row.extra.len() != self.extra_columns.len() {
            return Err(Error::configuration(format!(
                "method `{}` has {} extra columns {:?} but row `{}` carries {} values",
                self.method,
                self.extra_columns.len(),
                self.extra_columns,
                row.estimate.name,
                row.extra.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn columns(&self) -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .chain(self.extra_columns)
            .copied()
            .collect()
    }

    pub fn rows(&self) -> &[RatioRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by sample name
    pub fn get(&self, name: &str) -> Option<&RatioRow> {
        self.rows.iter().find(|row| row.estimate.name == name)
    }

    /// Write the table as CSV with a header row
    ///
    /// # Errors
    /// Returns an error if writing to `writer` fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns())?;
        for row in &self.rows {
            let estimate = &row.estimate;
            let mut record = vec![estimate.name.clone()];
            record.extend(
                [
                    estimate.x,
                    estimate.sx,
                    estimate.y,
                    estimate.sy,
                    estimate.rho,
                ]
                .iter()
                .chain(&row.extra)
                .map(ToString::to_string),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RatioRow, RatioTable};
    use crate::estimate::RatioEstimate;
    use crate::ErrorKind;

    fn row(name: &str, extra: Vec<f64>) -> RatioRow {
        RatioRow {
            estimate: RatioEstimate {
                name: name.to_owned(),
                x: 0.1,
                sx: 0.01,
                y: 0.05,
                sy: 0.002,
                rho: -0.25,
            },
            extra,
        }
    }

    #[test]
    fn rows_must_match_the_schema() {
        let mut table = RatioTable::new("U-Pb", &[]);
        table.push(row("a", vec![])).unwrap();
        let err = table.push(row("b", vec![1., 2.])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn csv_has_a_header_and_one_line_per_row() {
        let mut table = RatioTable::new("Rb-Sr", &["Rb87Sr86", "s[Rb87Sr86]"]);
        table.push(row("a", vec![0.3, 0.01])).unwrap();
        table.push(row("b", vec![0.4, 0.02])).unwrap();

        let mut buffer = vec![];
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "name,x,s[x],y,s[y],rho,Rb87Sr86,s[Rb87Sr86]");
        assert_eq!(lines[1], "a,0.1,0.01,0.05,0.002,-0.25,0.3,0.01");
        assert!(lines[2].starts_with("b,"));
    }
}
