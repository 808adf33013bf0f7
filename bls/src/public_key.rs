use std::sync::OnceLock;

use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256};

use crate::{error::Error, DOMAIN_SEPARATION_TAG};

construct_fixed_hash! {
    /// Compressed BLS12-381 G1 point.
    pub struct PublicKeyBytes(48);
}

impl_fixed_hash_serde!(PublicKeyBytes, 48);

impl SszSize for PublicKeyBytes {
    const SIZE: Size = Size::Fixed { size: 48 };
}

impl<C> SszRead<C> for PublicKeyBytes {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() != 48 {
            return Err(ReadError::WrongSize {
                expected: 48,
                actual: bytes.len(),
            });
        }

        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for PublicKeyBytes {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for PublicKeyBytes {
    type PackingFactor = ssz::typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        ssz::merkle::merkleize_bytes(self.as_bytes(), 1)
    }
}

/// Decompressed public key.
#[derive(Clone, Debug)]
pub struct PublicKey(pub(crate) blst::min_pk::PublicKey);

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    pub fn from_bytes(bytes: PublicKeyBytes) -> Result<Self, Error> {
        blst::min_pk::PublicKey::key_validate(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidPublicKey)
    }

    #[must_use]
    pub fn to_bytes(&self) -> PublicKeyBytes {
        PublicKeyBytes(self.0.compress())
    }

    /// Verifies a single signature over `message` (a signing root).
    #[must_use]
    pub fn verify(&self, message: H256, signature: &crate::Signature) -> bool {
        signature.0.verify(
            true,
            message.as_bytes(),
            DOMAIN_SEPARATION_TAG,
            &[],
            &self.0,
            false,
        ) == blst::BLST_ERROR::BLST_SUCCESS
    }
}

/// Public key with its serialized form and a lazily decompressed point.
///
/// Decompression is expensive enough to dominate deposit processing,
/// so the point is computed at most once per validator.
#[derive(Clone, Debug, Default)]
pub struct CachedPublicKey {
    bytes: PublicKeyBytes,
    decompressed: OnceLock<PublicKey>,
}

impl From<PublicKeyBytes> for CachedPublicKey {
    fn from(bytes: PublicKeyBytes) -> Self {
        Self {
            bytes,
            decompressed: OnceLock::new(),
        }
    }
}

impl PartialEq for CachedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for CachedPublicKey {}

impl CachedPublicKey {
    #[must_use]
    pub const fn to_bytes(&self) -> PublicKeyBytes {
        self.bytes
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &PublicKeyBytes {
        &self.bytes
    }

    pub fn decompress(&self) -> Result<&PublicKey, Error> {
        if let Some(public_key) = self.decompressed.get() {
            return Ok(public_key);
        }

        let public_key = PublicKey::from_bytes(self.bytes)?;
        Ok(self.decompressed.get_or_init(|| public_key))
    }
}

impl SszSize for CachedPublicKey {
    const SIZE: Size = Size::Fixed { size: 48 };
}

impl<C> SszRead<C> for CachedPublicKey {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        PublicKeyBytes::from_ssz_unchecked(context, bytes).map(Self::from)
    }
}

impl SszWrite for CachedPublicKey {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.bytes.write_fixed(bytes)
    }
}

impl SszHash for CachedPublicKey {
    type PackingFactor = ssz::typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        self.bytes.hash_tree_root()
    }
}

pub struct AggregatePublicKey(blst::min_pk::AggregatePublicKey);

impl AggregatePublicKey {
    pub fn aggregate<'keys>(
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> Result<Self, Error> {
        let points = public_keys
            .into_iter()
            .map(|public_key| &public_key.0)
            .collect::<Vec<_>>();

        if points.is_empty() {
            return Err(Error::NoPublicKeysToAggregate);
        }

        blst::min_pk::AggregatePublicKey::aggregate(&points, false)
            .map(Self)
            .map_err(|_| Error::InvalidPublicKey)
    }

    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }
}
