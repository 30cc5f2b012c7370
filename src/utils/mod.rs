//! # Utility Modules
//!
//! Supporting utilities for cryptography, compression, and logging.
//!
//! ## Components
//! - **Crypto**: AES-128/CFB8 stream cipher pair and the RSA key-exchange
//!   helper
//! - **Compression**: zlib with exact-length validation and a
//!   decompression-bomb bound
//! - **Logging**: structured logging configuration
//!
//! ## Security
//! - Cryptographically secure RNG for the shared secret
//! - Shared secret memory zeroed on drop (zeroize crate)

pub mod compression;
pub mod crypto;
pub mod logging;
