use std::io::Write;

use crate::error::CollectorError;

/// Write a header (when present) and rows as RFC 4180 CSV with CRLF terminators.
///
/// Rows are written as-is; their width is not checked against the header.
pub fn write_csv_to_writer<W: Write>(
    columns: &[String],
    rows: &[Vec<String>],
    delimiter: u8,
    writer: W,
) -> Result<(), CollectorError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::CRLF)
        .flexible(true)
        .from_writer(writer);

    if !columns.is_empty() {
        csv_writer.write_record(columns).map_err(csv_error)?;
    }
    for row in rows {
        csv_writer.write_record(row).map_err(csv_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> CollectorError {
    CollectorError::Write {
        message: format!("error writing CSV record: {e}"),
    }
}
