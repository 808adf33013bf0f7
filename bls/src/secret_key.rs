use zeroize::Zeroizing;

use ssz::H256;

use crate::{
    error::Error,
    public_key::PublicKey,
    signature::Signature,
    DOMAIN_SEPARATION_TAG,
};

/// BLS12-381 secret scalar. The key material is zeroized on drop by `blst`.
pub struct SecretKey(blst::min_pk::SecretKey);

impl SecretKey {
    /// Derives a key from at least 32 bytes of input key material
    /// per the `KeyGen` procedure of the BLS signature draft.
    pub fn derive_from_ikm(input_key_material: &[u8]) -> Result<Self, Error> {
        let material = Zeroizing::new(input_key_material.to_vec());

        blst::min_pk::SecretKey::key_gen(&material, &[])
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        PublicKey(self.0.sk_to_pk())
    }

    #[must_use]
    pub fn sign(&self, message: H256) -> Signature {
        Signature(self.0.sign(message.as_bytes(), DOMAIN_SEPARATION_TAG, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_under_the_matching_public_key() {
        let secret_key = SecretKey::derive_from_ikm(&[7; 32]).expect("enough key material");
        let public_key = secret_key.to_public_key();
        let message = H256::repeat_byte(0x55);

        let signature = secret_key.sign(message);

        assert!(public_key.verify(message, &signature));
        assert!(!public_key.verify(H256::repeat_byte(0x56), &signature));
    }

    #[test]
    fn key_generation_is_deterministic_in_the_input_material() {
        let first = SecretKey::derive_from_ikm(&[1; 32]).expect("enough key material");
        let second = SecretKey::derive_from_ikm(&[1; 32]).expect("enough key material");
        let different = SecretKey::derive_from_ikm(&[2; 32]).expect("enough key material");

        assert_eq!(
            first.to_public_key().to_bytes(),
            second.to_public_key().to_bytes(),
        );
        assert_ne!(
            first.to_public_key().to_bytes(),
            different.to_public_key().to_bytes(),
        );
    }
}
