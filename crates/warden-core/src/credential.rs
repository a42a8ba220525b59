//! Salted iterated-hash credentials
//!
//! Passwords are never stored or transmitted in plaintext. A credential
//! is a fresh random salt plus a PBKDF2-HMAC-SHA512 derivation of the
//! password under that salt, encoded as fixed-width hex (salt first) so
//! the boundary is unambiguous on decode.

use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::{DEFAULT_HASH_ITERATIONS, DERIVED_LEN, SALT_LEN};

/// Hex length of the salt prefix in the encoded form
const SALT_HEX_LEN: usize = SALT_LEN * 2;

/// A stored password credential: random salt + derived key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: [u8; SALT_LEN],
    derived: [u8; DERIVED_LEN],
}

impl Credential {
    /// Derive a fresh credential for `password` with a new random salt.
    ///
    /// CPU-bound at the configured iteration count; callers on an async
    /// runtime should run this on a blocking worker.
    pub fn derive(password: &str, iterations: u32) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let derived = derive_key(password, &salt, iterations)?;
        Ok(Self { salt, derived })
    }

    /// Derive with the default iteration count
    pub fn derive_default(password: &str) -> Result<Self> {
        Self::derive(password, DEFAULT_HASH_ITERATIONS)
    }

    /// Verify `password` against this credential.
    ///
    /// Comparison is constant-time. A wrong password is `false`, not an
    /// error.
    pub fn verify(&self, password: &str, iterations: u32) -> bool {
        match derive_key(password, &self.salt, iterations) {
            Ok(candidate) => self.derived[..].ct_eq(&candidate[..]).into(),
            Err(_) => false,
        }
    }

    /// Encode for storage: salt hex (64 chars) followed by derived-key
    /// hex (128 chars).
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(SALT_HEX_LEN + DERIVED_LEN * 2);
        out.push_str(&hex::encode(self.salt));
        out.push_str(&hex::encode(self.derived));
        out
    }

    /// Decode a stored credential.
    pub fn decode(encoded: &str) -> Result<Self> {
        let expected = SALT_HEX_LEN + DERIVED_LEN * 2;
        if !encoded.is_ascii() {
            return Err(Error::CredentialFormat("non-ascii input".to_string()));
        }
        if encoded.len() != expected {
            return Err(Error::CredentialFormat(format!(
                "expected {} hex chars, got {}",
                expected,
                encoded.len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        hex::decode_to_slice(&encoded[..SALT_HEX_LEN], &mut salt)
            .map_err(|e| Error::CredentialFormat(format!("invalid salt hex: {}", e)))?;

        let mut derived = [0u8; DERIVED_LEN];
        hex::decode_to_slice(&encoded[SALT_HEX_LEN..], &mut derived)
            .map_err(|e| Error::CredentialFormat(format!("invalid key hex: {}", e)))?;

        Ok(Self { salt, derived })
    }

    /// The salt bytes (exposed for diagnostics/tests)
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }
}

impl std::fmt::Debug for Credential {
    // Never print key material
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("salt", &hex::encode(&self.salt[..4]))
            .finish_non_exhaustive()
    }
}

/// PBKDF2-HMAC-SHA512 over `salt || password`
fn derive_key(password: &str, salt: &[u8; SALT_LEN], iterations: u32) -> Result<[u8; DERIVED_LEN]> {
    let password = Zeroizing::new(password.as_bytes().to_vec());
    let mut out = [0u8; DERIVED_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password.as_slice(), salt, iterations, &mut out)
        .map_err(|e| Error::Crypto(format!("key derivation failed: {}", e)))?;
    Ok(out)
}
