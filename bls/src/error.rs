use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("compressed public key is invalid or not in the G1 subgroup")]
    InvalidPublicKey,
    #[error("compressed signature is invalid or not in the G2 subgroup")]
    InvalidSignature,
    #[error("secret key is invalid")]
    InvalidSecretKey,
    #[error("no public keys to aggregate")]
    NoPublicKeysToAggregate,
}
