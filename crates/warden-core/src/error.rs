//! Error types for the Warden core library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential format error: {0}")]
    CredentialFormat(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
