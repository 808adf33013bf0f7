use anyhow::Result;
use bls::{CachedPublicKey, Signature, SignatureBytes};
use thiserror::Error;
use types::phase0::primitives::H256;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignatureKind {
    Attestation,
    AttesterSlashing,
    Block,
    BlockHeaderInProposerSlashing,
    Deposit,
    Randao,
    SyncAggregate,
    VoluntaryExit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("{kind:?} signature is invalid")]
    SignatureInvalid { kind: SignatureKind },
}

/// Strategy for BLS verification during a transition.
///
/// [`SingleVerifier`] verifies every signature as it is encountered.
/// [`NullVerifier`] skips them all, for blocks that are already trusted.
pub trait Verifier {
    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()>;

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()>;
}

impl<V: Verifier> Verifier for &mut V {
    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_singular(signing_root, signature, public_key, kind)
    }

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_aggregate(signing_root, signature, public_keys, kind)
    }
}

pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    fn verify_singular(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_key: &CachedPublicKey,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature =
            Signature::from_bytes(signature).map_err(|_| Error::SignatureInvalid { kind })?;

        anyhow::ensure!(
            public_key.decompress()?.verify(signing_root, &signature),
            Error::SignatureInvalid { kind },
        );

        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        signing_root: H256,
        signature: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        kind: SignatureKind,
    ) -> Result<()> {
        let signature =
            Signature::from_bytes(signature).map_err(|_| Error::SignatureInvalid { kind })?;

        let decompressed = public_keys
            .into_iter()
            .map(CachedPublicKey::decompress)
            .collect::<Result<Vec<_>, _>>()?;

        anyhow::ensure!(
            signature.fast_aggregate_verify(signing_root, decompressed),
            Error::SignatureInvalid { kind },
        );

        Ok(())
    }
}

pub struct NullVerifier;

impl Verifier for NullVerifier {
    fn verify_singular(
        &mut self,
        _signing_root: H256,
        _signature: SignatureBytes,
        _public_key: &CachedPublicKey,
        _kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        _signing_root: H256,
        _signature: SignatureBytes,
        _public_keys: impl IntoIterator<Item = &'keys CachedPublicKey>,
        _kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }
}
