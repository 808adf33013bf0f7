//! Deterministic keys and deposits for development networks and tests.

use bls::{PublicKey, SecretKey};
use helper_functions::misc;
use types::{
    config::Config,
    phase0::{
        consts::DOMAIN_DEPOSIT,
        containers::{DepositData, DepositMessage},
        primitives::ValidatorIndex,
    },
    preset::Preset,
};

/// Secret key for a numbered development validator.
/// Derived from the index alone, so every run agrees on the key.
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let input_key_material = hashing::hash_bytes(&validator_index.to_le_bytes());

    SecretKey::derive_from_ikm(input_key_material.as_bytes())
        .expect("hashed key material is long enough and uniformly distributed")
}

#[must_use]
pub fn public_key(validator_index: ValidatorIndex) -> PublicKey {
    secret_key(validator_index).to_public_key()
}

/// A full-balance deposit with a valid proof of possession,
/// ready for genesis construction.
#[must_use]
pub fn quick_start_deposit_data<P: Preset>(
    config: &Config,
    validator_index: ValidatorIndex,
) -> DepositData {
    let secret_key = secret_key(validator_index);
    let pubkey = secret_key.to_public_key().to_bytes();

    // BLS withdrawal credentials: a zero prefix byte over the pubkey hash.
    let mut withdrawal_credentials = hashing::hash_bytes(pubkey.as_bytes());
    withdrawal_credentials.as_bytes_mut()[0] = 0;

    let message = DepositMessage {
        pubkey,
        withdrawal_credentials,
        amount: P::MAX_EFFECTIVE_BALANCE,
    };

    let domain = misc::compute_domain(config, DOMAIN_DEPOSIT, None, None);
    let signing_root = misc::compute_signing_root(&message, domain);
    let signature = secret_key.sign(signing_root).to_bytes();

    DepositData {
        pubkey,
        withdrawal_credentials,
        amount: P::MAX_EFFECTIVE_BALANCE,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_distinct() {
        assert_eq!(
            public_key(0).to_bytes(),
            secret_key(0).to_public_key().to_bytes(),
        );
        assert_ne!(public_key(0).to_bytes(), public_key(1).to_bytes());
    }

    #[test]
    fn deposit_data_carries_a_valid_proof_of_possession() {
        let config = Config::minimal();
        let data = quick_start_deposit_data::<types::preset::Minimal>(&config, 3);

        let message = DepositMessage {
            pubkey: data.pubkey,
            withdrawal_credentials: data.withdrawal_credentials,
            amount: data.amount,
        };

        let domain = misc::compute_domain(&config, DOMAIN_DEPOSIT, None, None);
        let signing_root = misc::compute_signing_root(&message, domain);

        let signature = bls::Signature::from_bytes(data.signature).expect("valid point");
        assert!(public_key(3).verify(signing_root, &signature));
    }
}
