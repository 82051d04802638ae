use std::io::Write;

use xz2::stream::{Action, Check, Status, Stream};
use xz2::write::XzEncoder;

use super::{Codec, CompressionAlgo};
use crate::error::{Result, SlmError};

pub struct LzmaCodec;

impl Codec for LzmaCodec {
    fn algo(&self) -> CompressionAlgo {
        CompressionAlgo::Lzma
    }

    fn compress(&self, src: &[u8], level: u32) -> Result<Vec<u8>> {
        let stream = Stream::new_easy_encoder(level, Check::Crc64)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut enc = XzEncoder::new_stream(Vec::new(), stream);
        enc.write_all(src)?;
        Ok(enc.finish()?)
    }

    fn decompress(&self, src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut stream = Stream::new_stream_decoder(u64::MAX, 0)
            .map_err(|e| SlmError::Decompress(format!("xz decoder init failed: {e}")))?;
        let mut out = vec![0u8; expected_len];
        loop {
            let consumed = stream.total_in() as usize;
            let produced = stream.total_out() as usize;
            let status = stream
                .process(&src[consumed..], &mut out[produced..], Action::Finish)
                .map_err(|e| SlmError::Decompress(format!("xz: {e}")))?;
            match status {
                Status::StreamEnd => break,
                _ => {
                    if stream.total_in() as usize == consumed
                        && stream.total_out() as usize == produced
                    {
                        return Err(SlmError::Decompress(
                            "xz: stream disagrees with expected length".into(),
                        ));
                    }
                }
            }
        }
        if stream.total_in() as usize != src.len() {
            return Err(SlmError::Decompress(
                "xz: trailing bytes after stream end".into(),
            ));
        }
        if stream.total_out() as usize != expected_len {
            return Err(SlmError::Decompress(format!(
                "xz: produced {} bytes, expected {}",
                stream.total_out(),
                expected_len
            )));
        }
        Ok(out)
    }
}
