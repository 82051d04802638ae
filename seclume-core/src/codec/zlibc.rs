use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use super::{Codec, CompressionAlgo};
use crate::error::{Result, SlmError};

pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn algo(&self) -> CompressionAlgo {
        CompressionAlgo::Zlib
    }

    fn compress(&self, src: &[u8], level: u32) -> Result<Vec<u8>> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::new(level));
        enc.write_all(src)?;
        Ok(enc.finish()?)
    }

    fn decompress(&self, src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; expected_len];
        let mut d = Decompress::new(true);
        loop {
            let consumed = d.total_in() as usize;
            let produced = d.total_out() as usize;
            let status = d
                .decompress(&src[consumed..], &mut out[produced..], FlushDecompress::Finish)
                .map_err(|e| SlmError::Decompress(format!("zlib: {e}")))?;
            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    // No forward progress means the stream is truncated or
                    // wants more output space than the caller expects.
                    if d.total_in() as usize == consumed && d.total_out() as usize == produced {
                        return Err(SlmError::Decompress(
                            "zlib: stream disagrees with expected length".into(),
                        ));
                    }
                }
            }
        }
        if d.total_in() as usize != src.len() {
            return Err(SlmError::Decompress(
                "zlib: trailing bytes after stream end".into(),
            ));
        }
        if d.total_out() as usize != expected_len {
            return Err(SlmError::Decompress(format!(
                "zlib: produced {} bytes, expected {}",
                d.total_out(),
                expected_len
            )));
        }
        Ok(out)
    }
}
