use crate::error::{Result, SlmError};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompressionAlgo {
    Zlib = 0,
    Lzma = 1,
}

impl CompressionAlgo {
    pub fn from_u8(raw: u8) -> Result<Self> {
        match raw {
            x if x == CompressionAlgo::Zlib as u8 => Ok(CompressionAlgo::Zlib),
            x if x == CompressionAlgo::Lzma as u8 => Ok(CompressionAlgo::Lzma),
            _ => Err(SlmError::Format(format!(
                "invalid compression algorithm in header ({raw})"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionAlgo::Zlib => "zlib",
            CompressionAlgo::Lzma => "LZMA",
        }
    }
}

/// Single-shot codec. Levels run 0..=9 for both algorithms.
///
/// `decompress` takes the exact output size the caller expects (known from
/// authenticated metadata) and fails on any disagreement: truncated stream,
/// trailing garbage, or a stream that inflates to a different length. The
/// expectation also bounds the output allocation.
pub trait Codec: Send + Sync {
    fn algo(&self) -> CompressionAlgo;
    fn compress(&self, src: &[u8], level: u32) -> Result<Vec<u8>>;
    fn decompress(&self, src: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

pub mod lzmac;
pub mod zlibc;

pub fn codec_for(algo: CompressionAlgo) -> &'static dyn Codec {
    match algo {
        CompressionAlgo::Zlib => &zlibc::ZlibCodec,
        CompressionAlgo::Lzma => &lzmac::LzmaCodec,
    }
}

pub const MAX_LEVEL: u8 = 9;
