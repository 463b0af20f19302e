use crate::cell::CellValue;
use crate::report::Row;
use crate::ReportResult;
use csv_async::{AsyncReaderBuilder, StringRecord, Trim};
use tokio::io::AsyncRead;

/// Headers, bounded typed sample and exact row count of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: u64,
}

impl ParsedTable {
    /// True when rows were counted beyond the kept sample.
    pub fn is_truncated(&self) -> bool {
        self.row_count > self.rows.len() as u64
    }
}

/// Parses UTF-8 delimited text into a [`ParsedTable`].
///
/// The first record is the header row. Every data row is read and counted;
/// only the first `sample_cap` are typed and kept. Rows shorter than the
/// header get `Null` for the missing fields; extra trailing fields are
/// ignored. Any CSV or I/O error aborts the whole parse.
pub async fn parse_table<R>(
    reader: R,
    delimiter: char,
    sample_cap: usize,
    buffer_capacity: usize,
) -> ReportResult<ParsedTable>
where
    R: AsyncRead + Unpin + Send,
{
    let mut rdr = AsyncReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter))
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .buffer_capacity(buffer_capacity)
        .create_reader(reader);

    let headers: Vec<String> = rdr.headers().await?.iter().map(str::to_owned).collect();

    let mut rows = Vec::with_capacity(sample_cap.min(1024));
    let mut row_count = 0u64;
    let mut record = StringRecord::new();

    while rdr.read_record(&mut record).await? {
        row_count += 1;
        if rows.len() < sample_cap {
            let cells = (0..headers.len())
                .map(|idx| record.get(idx).map_or(CellValue::Null, CellValue::infer))
                .collect();
            rows.push(Row(cells));
        }
    }

    Ok(ParsedTable {
        headers,
        rows,
        row_count,
    })
}

/// csv_async wants a byte; every sniffed candidate is ASCII.
fn delimiter_byte(delimiter: char) -> u8 {
    u8::try_from(delimiter).unwrap_or(b',')
}
