#![forbid(unsafe_code)]

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;

pub mod util {
    pub mod modestr;
    pub mod sanitize;
}

pub mod crypto {
    pub mod aead;
    pub mod kdf;
    pub mod mac;
    pub mod random;
}

pub mod codec;

pub mod container {
    pub mod entry;
    pub mod header;
}

pub mod pack {
    pub mod writer;
}

pub mod read {
    pub mod extract;
}

pub mod list;

pub use crate::error::{Result, SlmError};

pub use codec::CompressionAlgo;

pub use pack::writer::{PackEntry, PackOptions, pack};

pub use read::extract::{ExtractOptions, extract};

pub use list::{ListSummary, list};

pub use container::header::{MAX_FILES, VERSION_CURRENT};

pub mod prelude {
    pub use crate::codec::CompressionAlgo;
    pub use crate::error::{Result, SlmError};
    pub use crate::list::{ListSummary, list};
    pub use crate::pack::writer::{PackEntry, PackOptions, pack};
    pub use crate::read::extract::{ExtractOptions, extract};
}
