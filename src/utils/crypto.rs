//! AES-128/CFB8 stream encryption and the RSA key-exchange helper.
//!
//! Once the login handshake completes, every byte on the wire in both
//! directions passes through a CFB8 stream keyed with the 16-byte shared
//! secret (key and IV are the same value, per protocol convention). The
//! secret itself travels to the server RSA-encrypted with PKCS#1 v1.5
//! padding against the server's DER-encoded public key.

use crate::error::{ProtocolError, Result};
use aes::cipher::inout::InOutBuf;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use zeroize::Zeroizing;

type Cfb8Encryptor = cfb8::Encryptor<Aes128>;
type Cfb8Decryptor = cfb8::Decryptor<Aes128>;

/// Length of the symmetric key exchanged during login.
pub const SHARED_SECRET_LEN: usize = 16;

/// CFB8 encryptor/decryptor pair, a no-op passthrough until activated.
///
/// Activation happens exactly once per connection; there is no mid-stream
/// disable. Both directions advance independent cipher states.
#[derive(Default)]
pub struct CryptoUnit {
    encryptor: Option<Cfb8Encryptor>,
    decryptor: Option<Cfb8Decryptor>,
}

impl CryptoUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise both cipher states with key = IV = `secret`.
    pub fn enable(&mut self, secret: &[u8; SHARED_SECRET_LEN]) {
        self.encryptor = Some(Cfb8Encryptor::new(secret.into(), secret.into()));
        self.decryptor = Some(Cfb8Decryptor::new(secret.into(), secret.into()));
    }

    pub fn is_enabled(&self) -> bool {
        self.encryptor.is_some()
    }

    /// Encrypt `buf` in place; byte-for-byte, no length change.
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        if let Some(cipher) = self.encryptor.as_mut() {
            let (blocks, rest) = InOutBuf::from(buf).into_chunks();
            debug_assert!(rest.is_empty());
            cipher.encrypt_blocks_inout_mut(blocks);
        }
    }

    /// Decrypt `buf` in place; byte-for-byte, no length change.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        if let Some(cipher) = self.decryptor.as_mut() {
            let (blocks, rest) = InOutBuf::from(buf).into_chunks();
            debug_assert!(rest.is_empty());
            cipher.decrypt_blocks_inout_mut(blocks);
        }
    }
}

/// Generate a fresh 16-byte shared secret from the OS CSPRNG.
pub fn generate_shared_secret() -> Zeroizing<[u8; SHARED_SECRET_LEN]> {
    let mut secret = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    OsRng.fill_bytes(secret.as_mut());
    secret
}

/// RSA-encrypt the shared secret and the server's verify token against the
/// server's X.509/DER public key.
///
/// Returns the two ciphertexts to place verbatim in the serverbound
/// encryption-begin response.
///
/// # Errors
/// [`ProtocolError::InvalidPublicKey`] if the DER blob does not parse;
/// [`ProtocolError::EncryptionFailure`] if either RSA operation fails.
pub fn seal_handshake(
    public_key_der: &[u8],
    secret: &[u8; SHARED_SECRET_LEN],
    verify_token: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let key =
        RsaPublicKey::from_public_key_der(public_key_der).map_err(|_| ProtocolError::InvalidPublicKey)?;

    let sealed_secret = key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, secret.as_slice())
        .map_err(|_| ProtocolError::EncryptionFailure)?;
    let sealed_token = key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, verify_token)
        .map_err(|_| ProtocolError::EncryptionFailure)?;

    Ok((sealed_secret, sealed_token))
}
