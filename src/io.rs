use crate::codec::Transcoder;
use crate::sniff::SniffedEncoding;
use crate::{ReportError, ReportResult};
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use bytes::Bytes;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// File extensions accepted as delimited text (before any compression suffix).
const TEXT_EXTENSIONS: [&str; 3] = [".csv", ".tsv", ".txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

#[derive(Debug, Clone, Default)]
pub struct UploadMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// client-side file name (used for extension checks)
    pub name_hint: String,
}

impl UploadMeta {
    /// Lightweight meta from the file name only.
    pub fn from_file_name(name: impl Into<String>) -> Self {
        let name_hint = name.into();
        let lower = name_hint.to_ascii_lowercase();
        let (content_type, content_encoding) = if lower.ends_with(".gz") {
            ("application/gzip", "gzip")
        } else if lower.ends_with(".zst") {
            ("application/zstd", "zstd")
        } else {
            ("text/csv", "")
        };
        Self {
            content_type: content_type.into(),
            content_encoding: content_encoding.into(),
            name_hint,
        }
    }

    /// Decompression choice: encoding -> type -> extension.
    pub fn compression(&self) -> Compression {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        let name = self.name_hint.to_ascii_lowercase();

        let is_gzip = ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || name.ends_with(".gz");
        let is_zstd = ce.split(',').any(|s| s.trim() == "zstd")
            || ct == "application/zstd"
            || name.ends_with(".zst");

        if is_gzip {
            Compression::Gzip
        } else if is_zstd {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    /// True when the name, minus any compression suffix, has a text extension.
    pub fn is_delimited_text(&self) -> bool {
        let name = self.name_hint.to_ascii_lowercase();
        let stem = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".zst"))
            .unwrap_or(&name);
        TEXT_EXTENSIONS.iter().any(|ext| stem.ends_with(ext))
    }
}

/// A file as handed over by the upload layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub meta: UploadMeta,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            meta: UploadMeta::from_file_name(file_name),
            bytes: bytes.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.meta.name_hint
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Undoes transport compression, refusing bodies larger than `limit` bytes.
pub async fn read_body(raw: Bytes, compression: Compression, limit: u64) -> ReportResult<Bytes> {
    let decoder: Box<dyn AsyncRead + Unpin + Send> = match compression {
        Compression::None => {
            if raw.len() as u64 > limit {
                return Err(ReportError::TooLarge { limit });
            }
            return Ok(raw);
        }
        Compression::Gzip => Box::new(GzipDecoder::new(Cursor::new(raw))),
        Compression::Zstd => Box::new(ZstdDecoder::new(Cursor::new(raw))),
    };

    let mut body = Vec::new();
    decoder.take(limit.saturating_add(1)).read_to_end(&mut body).await?;
    if body.len() as u64 > limit {
        return Err(ReportError::TooLarge { limit });
    }
    Ok(Bytes::from(body))
}

/// Wraps the body in a UTF-8 reader suitable for csv_async.
///
/// The byte-order mark is dropped. Only a body that already validated as
/// UTF-8 skips the transcoder; a UTF-8 body announced by its BOM still goes
/// through it so malformed sequences become U+FFFD.
pub fn text_reader(body: Bytes, sniffed: SniffedEncoding) -> Box<dyn AsyncRead + Unpin + Send> {
    let payload = body.slice(sniffed.bom_len.min(body.len())..);
    if sniffed.encoding == encoding_rs::UTF_8 && sniffed.bom_len == 0 {
        Box::new(Cursor::new(payload))
    } else {
        let framed = FramedRead::new(Cursor::new(payload), Transcoder::new(sniffed.encoding));
        Box::new(StreamReader::new(framed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_from_name_and_headers() {
        assert_eq!(UploadMeta::from_file_name("a.csv").compression(), Compression::None);
        assert_eq!(UploadMeta::from_file_name("a.CSV.GZ").compression(), Compression::Gzip);
        assert_eq!(UploadMeta::from_file_name("a.csv.zst").compression(), Compression::Zstd);

        let meta = UploadMeta {
            content_encoding: "identity, gzip".into(),
            name_hint: "a.csv".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::Gzip);
    }

    #[test]
    fn only_text_extensions_are_accepted() {
        for ok in ["ventas.csv", "VENTAS.CSV", "x.tsv", "x.txt", "x.csv.gz", "x.tsv.zst"] {
            assert!(UploadMeta::from_file_name(ok).is_delimited_text(), "{ok}");
        }
        for bad in ["x.xlsx", "x.gz", "csv", "x.csv.bak", ""] {
            assert!(!UploadMeta::from_file_name(bad).is_delimited_text(), "{bad}");
        }
    }

    #[tokio::test]
    async fn plain_body_over_limit_is_refused() {
        let err = read_body(Bytes::from_static(b"a,b\n1,2\n"), Compression::None, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::TooLarge { limit: 4 }));
    }
}
