//! CSV and ZIP exports.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fundamentals::{FinancialsTable, FundamentalsReport, Metric};
use crate::indicators::RsiPoint;
use crate::{PriceSeries, UtcDateTime};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("nothing to export: no ticker produced data")]
    NothingToExport,
}

/// Writes `timestamp,Price,RSI`; undefined RSI values are empty cells.
pub fn write_rsi_csv<W: Write>(writer: W, rows: &[RsiPoint]) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "timestamp,Price,RSI")?;
    for row in rows {
        let rsi = row.rsi.map(|value| value.to_string()).unwrap_or_default();
        writeln!(writer, "{},{},{}", row.ts.format_rfc3339(), row.price, rsi)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `date,<metric labels>` with one line per reporting period.
pub fn write_financials_csv<W: Write>(
    writer: W,
    table: &FinancialsTable,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(writer);
    let header = Metric::ALL
        .iter()
        .map(|metric| metric.label())
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "date,{header}")?;

    for row in &table.rows {
        write!(writer, "{}", row.date.format_date())?;
        for value in row.values {
            write!(writer, ",{value}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `date,Close`.
pub fn write_price_history_csv<W: Write>(
    writer: W,
    series: &PriceSeries,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "date,Close")?;
    for point in series.points() {
        writeln!(writer, "{},{}", point.ts.format_date(), point.price)?;
    }
    writer.flush()?;
    Ok(())
}

/// Archive entry names for one ticker: financials first, then price history.
pub fn archive_entry_names(report: &FundamentalsReport, date: UtcDateTime) -> [String; 2] {
    let stem = format!("{}_{}", report.symbol, date.format_date());
    [
        format!("{stem}_financials.csv"),
        format!("{stem}_price_history.csv"),
    ]
}

/// Writes two deflated CSV entries per report and returns the entry names.
pub fn write_fundamentals_zip<W: Write + Seek>(
    writer: W,
    reports: &[FundamentalsReport],
    date: UtcDateTime,
) -> Result<Vec<String>, ExportError> {
    if reports.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut archive = ZipWriter::new(writer);
    let mut entries = Vec::with_capacity(reports.len() * 2);

    for report in reports {
        let [financials_name, history_name] = archive_entry_names(report, date);

        let mut financials = Vec::new();
        write_financials_csv(&mut financials, &report.table)?;
        archive.start_file(financials_name.as_str(), options)?;
        archive.write_all(&financials)?;

        let mut history = Vec::new();
        write_price_history_csv(&mut history, &report.price_history)?;
        archive.start_file(history_name.as_str(), options)?;
        archive.write_all(&history)?;

        entries.push(financials_name);
        entries.push(history_name);
    }

    archive.finish()?;
    Ok(entries)
}

pub fn save_rsi_csv(path: &Path, rows: &[RsiPoint]) -> Result<(), ExportError> {
    write_rsi_csv(File::create(path)?, rows)
}

/// Creates the archive at `path`.
///
/// The archive is staged in a temporary file next to `path` and only moved
/// into place once complete; nothing is left at `path` on failure.
pub fn save_fundamentals_zip(
    path: &Path,
    reports: &[FundamentalsReport],
    date: UtcDateTime,
) -> Result<Vec<String>, ExportError> {
    if reports.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    let entries = write_fundamentals_zip(staged.as_file_mut(), reports, date)?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    use crate::fundamentals::FinancialsRow;
    use crate::{PricePoint, Symbol};

    fn ts(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    fn report(symbol: &str) -> FundamentalsReport {
        let mut values = [0.0; Metric::ALL.len()];
        values[0] = 1.5;
        let table = FinancialsTable {
            rows: vec![FinancialsRow {
                date: ts("2023-12-31T00:00:00Z"),
                values,
            }],
        };
        FundamentalsReport {
            symbol: Symbol::parse(symbol).expect("valid"),
            company_name: None,
            normalized: table.normalized(),
            table,
            price_history: PriceSeries::from_points(vec![PricePoint {
                ts: ts("2024-01-02T00:00:00Z"),
                price: 101.25,
            }]),
        }
    }

    #[test]
    fn rsi_csv_leaves_undefined_cells_empty() {
        let rows = vec![
            RsiPoint { ts: ts("2024-01-01T00:00:00Z"), price: 10.0, rsi: None },
            RsiPoint { ts: ts("2024-01-01T01:00:00Z"), price: 11.0, rsi: Some(55.5) },
        ];
        let mut buffer = Vec::new();
        write_rsi_csv(&mut buffer, &rows).expect("csv");

        let text = String::from_utf8(buffer).expect("utf8");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "timestamp,Price,RSI");
        assert_eq!(lines[1], "2024-01-01T00:00:00Z,10,");
        assert_eq!(lines[2], "2024-01-01T01:00:00Z,11,55.5");
    }

    #[test]
    fn financials_csv_header_follows_metric_order() {
        let mut buffer = Vec::new();
        write_financials_csv(&mut buffer, &report("MSFT").table).expect("csv");

        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        let header = lines.next().expect("header");
        assert!(header.starts_with("date,EBIT,EBITDA,Gross Profit,"));
        assert!(header.ends_with("Equity/Gross Profit,Equity/Net Income"));
        assert!(lines.next().expect("row").starts_with("2023-12-31,1.5,0,"));
    }

    #[test]
    fn zip_holds_two_deflated_entries_per_ticker() {
        let reports = vec![report("AAPL"), report("TSLA")];
        let mut cursor = Cursor::new(Vec::new());
        let names = write_fundamentals_zip(&mut cursor, &reports, ts("2024-03-05T12:00:00Z"))
            .expect("zip");

        assert_eq!(names[0], "AAPL_2024-03-05_financials.csv");
        assert_eq!(names[3], "TSLA_2024-03-05_price_history.csv");

        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).expect("archive");
        assert_eq!(archive.len(), 4);
        let mut entry = archive
            .by_name("AAPL_2024-03-05_price_history.csv")
            .expect("entry");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut body = String::new();
        entry.read_to_string(&mut body).expect("read");
        assert_eq!(body, "date,Close\n2024-01-02,101.25\n");
    }

    #[test]
    fn failed_archive_leaves_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.zip");

        let error = save_fundamentals_zip(&path, &[report("AAPL"), report("AAPL")], UtcDateTime::now())
            .expect_err("repeated entry names must fail");

        assert!(matches!(error, ExportError::Zip(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn empty_batch_writes_no_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.zip");

        let error = save_fundamentals_zip(&path, &[], UtcDateTime::now()).expect_err("must fail");
        assert!(matches!(error, ExportError::NothingToExport));
        assert!(!path.exists());
    }
}
