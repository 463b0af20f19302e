//! Encoding and delimiter sniffing.
//!
//! Both sniffers are total: they always return something usable and never
//! fail. The encoding sniffer looks at the whole body, the delimiter sniffer
//! only at the first decoded line.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Field separators the delimiter sniffer chooses between, in tie-break order.
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// How far into the body we decode to find the first line.
pub const FIRST_LINE_PROBE_BYTES: usize = 8 * 1024;

/// Result of sniffing a byte body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedEncoding {
    pub encoding: &'static Encoding,
    /// Length of the byte-order mark at the start of the body (0 if none).
    pub bom_len: usize,
}

impl SniffedEncoding {
    /// The body with the byte-order mark removed.
    pub fn payload<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.bom_len.min(bytes.len())..]
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Selects a text encoding for `bytes`.
///
/// Order: UTF-8 BOM, UTF-16 BOMs, strict UTF-8 validation of the full body,
/// then Windows-1252. Validation has to come before the single-byte
/// fallback, otherwise UTF-8 accents decode as mojibake ("Ñ" as "Ã‘").
pub fn sniff_encoding(bytes: &[u8]) -> SniffedEncoding {
    let sniffed = if bytes.starts_with(UTF8_BOM) {
        SniffedEncoding {
            encoding: UTF_8,
            bom_len: UTF8_BOM.len(),
        }
    } else if bytes.starts_with(UTF16LE_BOM) {
        SniffedEncoding {
            encoding: UTF_16LE,
            bom_len: UTF16LE_BOM.len(),
        }
    } else if bytes.starts_with(UTF16BE_BOM) {
        SniffedEncoding {
            encoding: UTF_16BE,
            bom_len: UTF16BE_BOM.len(),
        }
    } else if std::str::from_utf8(bytes).is_ok() {
        SniffedEncoding {
            encoding: UTF_8,
            bom_len: 0,
        }
    } else {
        // encoding_rs maps the ISO-8859-1 label onto this same table, so there
        // is no separate Latin-1 fallback to reach for.
        SniffedEncoding {
            encoding: WINDOWS_1252,
            bom_len: 0,
        }
    };
    log::debug!(
        "sniffed encoding {} (bom: {} bytes)",
        sniffed.name(),
        sniffed.bom_len
    );
    sniffed
}

/// Decodes the first line of `bytes` (BOM already removed) with `encoding`.
///
/// Only a bounded prefix is decoded. A line ends at `\n`, `\r` or `\r\n`.
/// Returns `None` for an empty body.
pub fn first_line(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let probe = &bytes[..bytes.len().min(FIRST_LINE_PROBE_BYTES)];
    let (text, _had_errors) = encoding.decode_without_bom_handling(probe);
    text.split(['\r', '\n']).next().map(str::to_owned)
}

/// Picks the field separator from the first line.
///
/// A candidate wins only if it occurs strictly more often than every other
/// candidate. Ties, an empty line or no line at all give `,`.
pub fn sniff_delimiter(line: Option<&str>) -> char {
    let Some(line) = line.filter(|l| !l.is_empty()) else {
        return ',';
    };

    let counts = DELIMITER_CANDIDATES.map(|c| line.chars().filter(|&x| x == c).count());
    for (i, &candidate) in DELIMITER_CANDIDATES.iter().enumerate().skip(1) {
        let wins = counts
            .iter()
            .enumerate()
            .all(|(j, &other)| j == i || counts[i] > other);
        if wins {
            return candidate;
        }
    }
    ','
}
