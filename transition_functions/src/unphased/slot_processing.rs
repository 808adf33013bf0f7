use ssz::{Hc, SszHash as _};
use types::{preset::Preset, traits::BeaconState};

/// Per-slot bookkeeping, run before the slot number is incremented.
///
/// The state root written into history here is also patched into
/// `latest_block_header` if it is still zeroed, finalizing the header that
/// block processing left incomplete.
pub fn process_slot<P: Preset, S: BeaconState<P>>(state: &mut Hc<S>) {
    // > Cache state root
    let previous_state_root = state.hash_tree_root();
    let slot = state.slot();

    *state.state_roots_mut().mod_index_mut(slot) = previous_state_root;

    if state.latest_block_header().state_root.is_zero() {
        state.latest_block_header_mut().state_root = previous_state_root;
    }

    // > Cache block root
    let previous_block_root = state.latest_block_header().hash_tree_root();

    *state.block_roots_mut().mod_index_mut(slot) = previous_block_root;
}
