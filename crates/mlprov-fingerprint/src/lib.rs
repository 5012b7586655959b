//! mlprov Fingerprint
//!
//! Content digests and streamed file fingerprints.
//!
//! # Core Concepts
//!
//! - [`ContentDigest`]: 32-byte SHA-256 digest, rendered as lowercase hex
//! - [`DigestBuilder`]: running accumulator; any chunking of the same bytes yields the same digest
//! - [`Fingerprinter`]: reads a file in bounded chunks, honouring a [`CancellationToken`] and timeout
//! - [`Fingerprint`]: digest + byte size + creation timestamp
//!
//! # Example
//!
//! ```rust,no_run
//! use mlprov_fingerprint::Fingerprinter;
//!
//! let fp = Fingerprinter::new().fingerprint("data/train.csv")?;
//! println!("{} bytes, sha256 {}", fp.size, fp.digest);
//! # Ok::<(), mlprov_fingerprint::FingerprintError>(())
//! ```

#![warn(unreachable_pub)]

mod cancel;
mod digest;
mod fingerprint;

pub use cancel::CancellationToken;
pub use digest::{ContentDigest, DigestBuilder, HashError};
pub use fingerprint::{
    CancelReason, Fingerprint, FingerprintError, Fingerprinter, DEFAULT_CHUNK_SIZE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
