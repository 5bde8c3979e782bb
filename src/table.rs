use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use flate2::{Compression, read::MultiGzDecoder, write::GzEncoder};
use log::debug;

use crate::error::{PrepError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A table of string cells with named columns, stored column by column.
///
/// Cells are kept as read so that a table can be filtered and written back
/// without touching the values it does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl Table {
    /// Creates a new `Table`.
    ///
    /// # Returns
    /// A schema error if a header is repeated, or the amount of columns does not match the
    /// amount of headers, or the columns have different lengths.
    pub fn new(headers: Vec<String>, columns: Vec<Vec<String>>) -> Result<Self> {
        if headers.len() != columns.len() {
            return Err(PrepError::schema(format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(PrepError::schema(format!("duplicate column '{dup}'")));
        }

        if let Some(first) = columns.first() {
            if let Some((i, _)) = columns
                .iter()
                .enumerate()
                .find(|(_, c)| c.len() != first.len())
            {
                return Err(PrepError::schema(format!(
                    "column '{}' has {} cells, expected {}",
                    headers[i],
                    columns[i].len(),
                    first.len()
                )));
            }
        }

        Ok(Self { headers, columns })
    }

    /// Reads a table from a CSV file whose first row holds the headers.
    ///
    /// Gzip compressed files are recognized by their leading bytes, whatever their name.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = BufReader::new(File::open(path.as_ref())?);
        let table = if file.fill_buf()?.starts_with(&GZIP_MAGIC) {
            Self::from_reader(MultiGzDecoder::new(file))?
        } else {
            Self::from_reader(file)?
        };
        debug!(
            "read {} rows and {} columns from {}",
            table.nrows(),
            table.ncols(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Reads a CSV table from any reader.
    ///
    /// # Returns
    /// A schema error on a row with a different amount of cells than there are headers.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut columns = vec![Vec::new(); headers.len()];

        for (row, record) in reader.records().enumerate() {
            let record = record?;

            if record.len() != headers.len() {
                return Err(PrepError::schema(format!(
                    "row {row} has {} cells, expected {}",
                    record.len(),
                    headers.len()
                )));
            }

            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.push(cell.to_string());
            }
        }

        Self::new(headers, columns)
    }

    /// Writes this table as CSV, headers first.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.to_writer(file)?;
        debug!("wrote {} rows to {}", self.nrows(), path.as_ref().display());
        Ok(())
    }

    /// Writes this table as gzip compressed CSV.
    pub fn write_csv_gz<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut encoder = GzEncoder::new(File::create(path.as_ref())?, Compression::default());
        self.to_writer(&mut encoder)?;
        encoder.finish()?;
        debug!(
            "wrote {} compressed rows to {}",
            self.nrows(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;

        for row in 0..self.nrows() {
            writer.write_record(self.columns.iter().map(|c| c[row].as_str()))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Stacks the rows of several tables sharing the same headers, in order.
    pub fn concat<I>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut tables = tables.into_iter();
        let Some(mut acc) = tables.next() else {
            return Err(PrepError::schema("no tables to concatenate"));
        };

        for table in tables {
            if table.headers != acc.headers {
                return Err(PrepError::schema(format!(
                    "cannot concatenate tables with headers {:?} and {:?}",
                    acc.headers, table.headers
                )));
            }

            for (dst, src) in acc.columns.iter_mut().zip(table.columns) {
                dst.extend(src);
            }
        }

        Ok(acc)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn ncols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    /// Like `column`, but a missing column is a schema error.
    pub fn require_column(&self, name: &str) -> Result<&[String]> {
        self.column(name)
            .ok_or_else(|| PrepError::schema(format!("missing column '{name}'")))
    }

    /// Iterates `(header, cells)` pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Returns a table with only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| rows.iter().map(|&r| c[r].clone()).collect())
            .collect();

        Self {
            headers: self.headers.clone(),
            columns,
        }
    }

    /// Keeps only the columns `keep` returns true for.
    ///
    /// # Returns
    /// The names of the removed columns, in their original order.
    pub fn retain_columns<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut dropped = Vec::new();
        let mut headers = Vec::with_capacity(self.headers.len());
        let mut columns = Vec::with_capacity(self.columns.len());

        for (header, column) in self.headers.drain(..).zip(self.columns.drain(..)) {
            if keep(&header) {
                headers.push(header);
                columns.push(column);
            } else {
                dropped.push(header);
            }
        }

        self.headers = headers;
        self.columns = columns;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "city,time,cases\nA,0,3\nA,1,5\nB,0,0\n";

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_headers_and_cells() {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();

        assert_eq!(table.headers(), strings(&["city", "time", "cases"]));
        assert_eq!(table.nrows(), 3);
        assert_eq!(table.column("cases").unwrap(), strings(&["3", "5", "0"]));
        assert!(table.column("pop").is_none());
    }

    #[test]
    fn ragged_rows_are_a_schema_error() {
        let csv = "city,time,cases\nA,0\n";

        assert!(matches!(
            Table::from_reader(csv.as_bytes()),
            Err(PrepError::Schema(_))
        ));
    }

    #[test]
    fn duplicate_headers_are_a_schema_error() {
        let csv = "city,time,city\nA,0,A\n";

        assert!(matches!(
            Table::from_reader(csv.as_bytes()),
            Err(PrepError::Schema(_))
        ));
    }

    #[test]
    fn writes_what_it_reads() {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();
        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), CSV);
    }

    #[test]
    fn compressed_files_read_back() {
        let path = std::env::temp_dir()
            .join(format!("measles-forecast-table-{}.csv.gz", std::process::id()));
        let table = Table::from_reader(CSV.as_bytes()).unwrap();

        table.write_csv_gz(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));
        assert_ne!(bytes, CSV.as_bytes());

        assert_eq!(Table::read_csv(&path).unwrap(), table);
    }

    #[test]
    fn concat_stacks_rows() {
        let a = Table::from_reader(CSV.as_bytes()).unwrap();
        let b = Table::from_reader("city,time,cases\nC,4,1\n".as_bytes()).unwrap();
        let both = Table::concat([a, b]).unwrap();

        assert_eq!(both.nrows(), 4);
        assert_eq!(both.column("city").unwrap(), strings(&["A", "A", "B", "C"]));
    }

    #[test]
    fn concat_requires_equal_headers() {
        let a = Table::from_reader(CSV.as_bytes()).unwrap();
        let b = Table::from_reader("city,cases\nC,1\n".as_bytes()).unwrap();

        assert!(Table::concat([a, b]).is_err());
        assert!(Table::concat(Vec::new()).is_err());
    }

    #[test]
    fn select_and_retain() {
        let mut table = Table::from_reader(CSV.as_bytes()).unwrap();
        let dropped = table.retain_columns(|name| name != "time");

        assert_eq!(dropped, strings(&["time"]));
        assert_eq!(table.headers(), strings(&["city", "cases"]));

        let picked = table.select_rows(&[2, 0]);
        assert_eq!(picked.column("city").unwrap(), strings(&["B", "A"]));
    }
}
