use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use itertools::Itertools as _;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite, H256};

use crate::{error::Error, public_key::PublicKey, DOMAIN_SEPARATION_TAG};

construct_fixed_hash! {
    /// Compressed BLS12-381 G2 point.
    pub struct SignatureBytes(96);
}

impl_fixed_hash_serde!(SignatureBytes, 96);

impl SignatureBytes {
    /// The compressed point at infinity, used where no signers participated.
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.0[0] = 0xc0;
        bytes
    }
}

impl SszSize for SignatureBytes {
    const SIZE: Size = Size::Fixed { size: 96 };
}

impl<C> SszRead<C> for SignatureBytes {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() != 96 {
            return Err(ReadError::WrongSize {
                expected: 96,
                actual: bytes.len(),
            });
        }

        Ok(Self::from_slice(bytes))
    }
}

impl SszWrite for SignatureBytes {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.as_bytes());
    }
}

impl SszHash for SignatureBytes {
    type PackingFactor = ssz::typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        ssz::merkle::merkleize_bytes(self.as_bytes(), 2)
    }
}

/// Decompressed signature.
#[derive(Clone, Debug)]
pub struct Signature(pub(crate) blst::min_pk::Signature);

impl From<&Signature> for SignatureBytes {
    fn from(signature: &Signature) -> Self {
        Self(signature.0.compress())
    }
}

impl Signature {
    pub fn from_bytes(bytes: SignatureBytes) -> Result<Self, Error> {
        blst::min_pk::Signature::sig_validate(bytes.as_bytes(), false)
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }

    #[must_use]
    pub fn to_bytes(&self) -> SignatureBytes {
        SignatureBytes::from(self)
    }

    /// `FastAggregateVerify`: all public keys sign the same message.
    #[must_use]
    pub fn fast_aggregate_verify<'keys>(
        &self,
        message: H256,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let points = public_keys
            .into_iter()
            .map(|public_key| &public_key.0)
            .collect_vec();

        if points.is_empty() {
            return false;
        }

        self.0.fast_aggregate_verify(
            true,
            message.as_bytes(),
            DOMAIN_SEPARATION_TAG,
            &points,
        ) == blst::BLST_ERROR::BLST_SUCCESS
    }

    /// `AggregateVerify`: one message per public key.
    #[must_use]
    pub fn aggregate_verify<'keys>(
        &self,
        messages: impl IntoIterator<Item = H256>,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let messages = messages.into_iter().collect_vec();
        let message_slices = messages
            .iter()
            .map(ssz::H256::as_bytes)
            .collect_vec();
        let points = public_keys
            .into_iter()
            .map(|public_key| &public_key.0)
            .collect_vec();

        if points.is_empty() || points.len() != message_slices.len() {
            return false;
        }

        self.0.aggregate_verify(
            true,
            &message_slices,
            DOMAIN_SEPARATION_TAG,
            &points,
            false,
        ) == blst::BLST_ERROR::BLST_SUCCESS
    }
}

pub struct AggregateSignature(blst::min_pk::AggregateSignature);

impl AggregateSignature {
    pub fn aggregate<'signatures>(
        signatures: impl IntoIterator<Item = &'signatures Signature>,
    ) -> Result<Self, Error> {
        let points = signatures
            .into_iter()
            .map(|signature| &signature.0)
            .collect_vec();

        blst::min_pk::AggregateSignature::aggregate(&points, false)
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }

    #[must_use]
    pub fn to_signature(&self) -> Signature {
        Signature(self.0.to_signature())
    }
}

#[cfg(test)]
mod tests {
    use crate::SecretKey;

    use super::*;

    fn secret_key(byte: u8) -> SecretKey {
        SecretKey::derive_from_ikm(&[byte; 32]).expect("enough key material")
    }

    #[test]
    fn fast_aggregate_verify_accepts_aggregated_signatures() {
        let message = H256::repeat_byte(0x11);
        let secret_keys = [secret_key(1), secret_key(2), secret_key(3)];

        let signatures = secret_keys
            .iter()
            .map(|secret_key| secret_key.sign(message))
            .collect_vec();
        let aggregate = AggregateSignature::aggregate(&signatures)
            .expect("signatures are valid")
            .to_signature();

        let public_keys = secret_keys
            .iter()
            .map(SecretKey::to_public_key)
            .collect_vec();

        assert!(aggregate.fast_aggregate_verify(message, &public_keys));
        assert!(!aggregate.fast_aggregate_verify(message, &public_keys[..2]));
    }

    #[test]
    fn aggregate_verify_requires_distinct_messages_to_match() {
        let messages = [H256::repeat_byte(1), H256::repeat_byte(2)];
        let secret_keys = [secret_key(4), secret_key(5)];

        let signatures = secret_keys
            .iter()
            .zip(messages)
            .map(|(secret_key, message)| secret_key.sign(message))
            .collect_vec();
        let aggregate = AggregateSignature::aggregate(&signatures)
            .expect("signatures are valid")
            .to_signature();

        let public_keys = secret_keys
            .iter()
            .map(SecretKey::to_public_key)
            .collect_vec();

        assert!(aggregate.aggregate_verify(messages, &public_keys));
        assert!(!aggregate.aggregate_verify([messages[1], messages[0]], &public_keys));
    }

    #[test]
    fn empty_signature_decompresses_to_infinity_but_verifies_nothing() {
        let infinity = Signature::from_bytes(SignatureBytes::empty()).expect("point at infinity");
        assert!(!infinity.fast_aggregate_verify(H256::zero(), []));
    }
}
