//! Tagged sums over the fork variants of the top-level types.
//!
//! SSZ decoding is driven by the slot embedded in the serialized value and
//! the fork schedule in [`Config`], so it requires a context, unlike the
//! per-fork types.

use ssz::{
    Hc, PersistentList, ReadError, Size, SszHash, SszRead, SszSize, SszWrite, WriteError, H256,
};

use crate::{
    altair,
    bellatrix,
    config::Config,
    nonstandard::Phase,
    phase0,
    phase0::containers::{BeaconBlockHeader, Checkpoint, Fork, Validator},
    phase0::primitives::{Gwei, Slot, UnixSeconds},
    preset::Preset,
    traits::BeaconState as _,
};

const STATE_SLOT_OFFSET: usize = 40;
const BLOCK_SLOT_OFFSET: usize = ssz::BYTES_PER_LENGTH_OFFSET + 96;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BeaconState<P: Preset> {
    Phase0(Hc<phase0::beacon_state::BeaconState<P>>),
    Altair(Hc<altair::beacon_state::BeaconState<P>>),
    Bellatrix(Hc<bellatrix::beacon_state::BeaconState<P>>),
}

impl<P: Preset> BeaconState<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn genesis_time(&self) -> UnixSeconds {
        match self {
            Self::Phase0(state) => state.genesis_time,
            Self::Altair(state) => state.genesis_time,
            Self::Bellatrix(state) => state.genesis_time,
        }
    }

    #[must_use]
    pub fn genesis_validators_root(&self) -> H256 {
        match self {
            Self::Phase0(state) => state.genesis_validators_root,
            Self::Altair(state) => state.genesis_validators_root,
            Self::Bellatrix(state) => state.genesis_validators_root,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(state) => state.slot,
            Self::Altair(state) => state.slot,
            Self::Bellatrix(state) => state.slot,
        }
    }

    #[must_use]
    pub fn fork(&self) -> Fork {
        match self {
            Self::Phase0(state) => state.fork,
            Self::Altair(state) => state.fork,
            Self::Bellatrix(state) => state.fork,
        }
    }

    #[must_use]
    pub fn latest_block_header(&self) -> BeaconBlockHeader {
        match self {
            Self::Phase0(state) => state.latest_block_header,
            Self::Altair(state) => state.latest_block_header,
            Self::Bellatrix(state) => state.latest_block_header,
        }
    }

    #[must_use]
    pub fn validators(&self) -> &PersistentList<Validator, P::ValidatorRegistryLimit> {
        match self {
            Self::Phase0(state) => state.validators(),
            Self::Altair(state) => state.validators(),
            Self::Bellatrix(state) => state.validators(),
        }
    }

    #[must_use]
    pub fn balances(&self) -> &PersistentList<Gwei, P::ValidatorRegistryLimit> {
        match self {
            Self::Phase0(state) => state.balances(),
            Self::Altair(state) => state.balances(),
            Self::Bellatrix(state) => state.balances(),
        }
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        match self {
            Self::Phase0(state) => state.finalized_checkpoint,
            Self::Altair(state) => state.finalized_checkpoint,
            Self::Bellatrix(state) => state.finalized_checkpoint,
        }
    }
}

impl<P: Preset> From<phase0::beacon_state::BeaconState<P>> for BeaconState<P> {
    fn from(state: phase0::beacon_state::BeaconState<P>) -> Self {
        Self::Phase0(state.into())
    }
}

impl<P: Preset> From<altair::beacon_state::BeaconState<P>> for BeaconState<P> {
    fn from(state: altair::beacon_state::BeaconState<P>) -> Self {
        Self::Altair(state.into())
    }
}

impl<P: Preset> From<bellatrix::beacon_state::BeaconState<P>> for BeaconState<P> {
    fn from(state: bellatrix::beacon_state::BeaconState<P>) -> Self {
        Self::Bellatrix(state.into())
    }
}

impl<P: Preset> SszSize for BeaconState<P> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<P: Preset> SszRead<Config> for BeaconState<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        let slot = peek_slot(bytes, STATE_SLOT_OFFSET)?;

        let state = match config.phase_at_slot::<P>(slot) {
            Phase::Phase0 => Self::Phase0(Hc::from_ssz_unchecked(&(), bytes)?),
            Phase::Altair => Self::Altair(Hc::from_ssz_unchecked(&(), bytes)?),
            Phase::Bellatrix => Self::Bellatrix(Hc::from_ssz_unchecked(&(), bytes)?),
        };

        Ok(state)
    }
}

impl<P: Preset> SszWrite for BeaconState<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(state) => state.write_variable(bytes),
            Self::Altair(state) => state.write_variable(bytes),
            Self::Bellatrix(state) => state.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for BeaconState<P> {
    type PackingFactor = ssz::typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(state) => state.hash_tree_root(),
            Self::Altair(state) => state.hash_tree_root(),
            Self::Bellatrix(state) => state.hash_tree_root(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SignedBeaconBlock<P: Preset> {
    Phase0(phase0::containers::SignedBeaconBlock<P>),
    Altair(altair::containers::SignedBeaconBlock<P>),
    Bellatrix(bellatrix::containers::SignedBeaconBlock<P>),
}

impl<P: Preset> SignedBeaconBlock<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(block) => block.message.slot,
            Self::Altair(block) => block.message.slot,
            Self::Bellatrix(block) => block.message.slot,
        }
    }
}

impl<P: Preset> From<phase0::containers::SignedBeaconBlock<P>> for SignedBeaconBlock<P> {
    fn from(block: phase0::containers::SignedBeaconBlock<P>) -> Self {
        Self::Phase0(block)
    }
}

impl<P: Preset> From<altair::containers::SignedBeaconBlock<P>> for SignedBeaconBlock<P> {
    fn from(block: altair::containers::SignedBeaconBlock<P>) -> Self {
        Self::Altair(block)
    }
}

impl<P: Preset> From<bellatrix::containers::SignedBeaconBlock<P>> for SignedBeaconBlock<P> {
    fn from(block: bellatrix::containers::SignedBeaconBlock<P>) -> Self {
        Self::Bellatrix(block)
    }
}

impl<P: Preset> SszSize for SignedBeaconBlock<P> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<P: Preset> SszRead<Config> for SignedBeaconBlock<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        let slot = peek_slot(bytes, BLOCK_SLOT_OFFSET)?;

        let block = match config.phase_at_slot::<P>(slot) {
            Phase::Phase0 => Self::Phase0(SszRead::from_ssz_unchecked(&(), bytes)?),
            Phase::Altair => Self::Altair(SszRead::from_ssz_unchecked(&(), bytes)?),
            Phase::Bellatrix => Self::Bellatrix(SszRead::from_ssz_unchecked(&(), bytes)?),
        };

        Ok(block)
    }
}

impl<P: Preset> SszWrite for SignedBeaconBlock<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(block) => block.write_variable(bytes),
            Self::Altair(block) => block.write_variable(bytes),
            Self::Bellatrix(block) => block.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for SignedBeaconBlock<P> {
    type PackingFactor = ssz::typenum::U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.hash_tree_root(),
            Self::Altair(block) => block.hash_tree_root(),
            Self::Bellatrix(block) => block.hash_tree_root(),
        }
    }
}

fn peek_slot(bytes: &[u8], offset: usize) -> Result<Slot, ReadError> {
    let end = offset + core::mem::size_of::<Slot>();

    let slice = bytes.get(offset..end).ok_or(ReadError::TooShort {
        minimum: end,
        actual: bytes.len(),
    })?;

    u64::from_ssz_unchecked(&(), slice)
}

#[cfg(test)]
mod tests {
    use ssz::SszReadDefault as _;

    use crate::preset::Minimal;

    use super::*;

    #[test]
    fn state_decoding_selects_the_variant_by_slot() {
        let mut config = Config::minimal();
        config.altair_fork_epoch = 2;

        let mut phase0_state = phase0::beacon_state::BeaconState::<Minimal>::default();
        phase0_state.slot = 15;

        let mut altair_state = altair::beacon_state::BeaconState::<Minimal>::default();
        altair_state.slot = 16;

        let phase0_bytes = phase0_state.to_ssz().expect("state serializes");
        let altair_bytes = altair_state.to_ssz().expect("state serializes");

        let decoded_phase0 =
            BeaconState::<Minimal>::from_ssz_unchecked(&config, &phase0_bytes).expect("valid");
        let decoded_altair =
            BeaconState::<Minimal>::from_ssz_unchecked(&config, &altair_bytes).expect("valid");

        assert_eq!(decoded_phase0.phase(), Phase::Phase0);
        assert_eq!(decoded_altair.phase(), Phase::Altair);

        assert_eq!(
            decoded_phase0.to_ssz().expect("state serializes"),
            phase0_bytes,
        );
    }

    #[test]
    fn state_root_is_preserved_across_the_combined_wrapper() {
        let state = phase0::beacon_state::BeaconState::<Minimal>::default();
        let root = state.hash_tree_root();

        let combined = BeaconState::from(state.clone());
        assert_eq!(combined.hash_tree_root(), root);

        let bytes = combined.to_ssz().expect("state serializes");
        let plain = phase0::beacon_state::BeaconState::<Minimal>::from_ssz_default(&bytes)
            .expect("valid");
        assert_eq!(plain, state);
    }
}
