//! Thin wrapper around `blst` exposing the verification interface
//! needed by the state transition function.

pub use crate::{
    error::Error,
    public_key::{AggregatePublicKey, CachedPublicKey, PublicKey, PublicKeyBytes},
    secret_key::SecretKey,
    signature::{AggregateSignature, Signature, SignatureBytes},
};

mod error;
mod public_key;
mod secret_key;
mod signature;

/// Domain separation tag for BLS signatures on BLS12-381 G2, proof of possession scheme.
pub(crate) const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
