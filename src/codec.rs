use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Streams bytes of any `encoding_rs` encoding out as UTF-8.
///
/// Malformed input becomes U+FFFD. The input must already have its
/// byte-order mark removed.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_without_bom_handling(),
        }
    }

    fn out_buffer(&self, len: usize) -> Vec<u8> {
        vec![
            0;
            self.decoder
                .max_utf8_buffer_length(len)
                .unwrap_or_else(|| len.saturating_mul(3))
        ]
    }
}

impl Decoder for Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut temp_out = self.out_buffer(src.len());
        let (_result, bytes_read, bytes_written, _had_replacements) =
            self.decoder.decode_to_utf8(src, &mut temp_out, false);

        // A lone trailing half of a UTF-16 unit is buffered inside the decoder.
        if bytes_read == 0 && bytes_written == 0 {
            return Ok(None);
        }

        src.advance(bytes_read);
        Ok(Some(BytesMut::from(&temp_out[..bytes_written])))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut temp_out = self.out_buffer(buf.len());
        let (_result, _bytes_read, bytes_written, _had_replacements) =
            self.decoder.decode_to_utf8(buf, &mut temp_out, true);

        buf.clear();

        if bytes_written > 0 {
            Ok(Some(BytesMut::from(&temp_out[..bytes_written])))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcodes_windows_1252_accents() {
        let mut codec = Transcoder::new(encoding_rs::WINDOWS_1252);
        // "Año,Ñ" in Windows-1252
        let mut src = BytesMut::from(&[0x41, 0xF1, 0x6F, 0x2C, 0xD1][..]);
        let out = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), "Año,Ñ");
        assert!(src.is_empty());
    }

    #[test]
    fn utf16_split_code_unit_survives_chunk_boundary() {
        let mut codec = Transcoder::new(encoding_rs::UTF_16LE);
        let mut first = BytesMut::from(&[0x61, 0x00, 0xD1][..]);
        let a = codec.decode(&mut first).unwrap().unwrap();
        let mut rest = BytesMut::from(&[0x00][..]);
        let b = codec.decode_eof(&mut rest).unwrap().unwrap();

        let mut joined = a.to_vec();
        joined.extend_from_slice(&b);
        assert_eq!(String::from_utf8(joined).unwrap(), "aÑ");
    }

    #[test]
    fn malformed_utf8_is_replaced() {
        let mut codec = Transcoder::new(encoding_rs::UTF_8);
        let mut src = BytesMut::from(&b"Ni\xF1o,3\n"[..]);
        let mut out = codec.decode(&mut src).unwrap().unwrap();
        if let Some(tail) = codec.decode_eof(&mut src).unwrap() {
            out.extend_from_slice(&tail);
        }
        assert_eq!(std::str::from_utf8(&out).unwrap(), "Ni\u{FFFD}o,3\n");
    }
}
