pub use ethereum_types::H256;
pub use ssz_derive::Ssz;
pub use typenum;

pub use crate::{
    bit_list::BitList,
    bit_vector::BitVector,
    byte_list::ByteList,
    byte_vector::ByteVector,
    contiguous_list::ContiguousList,
    contiguous_vector::ContiguousVector,
    error::{IndexError, PushError, ReadError, WriteError},
    hc::Hc,
    persistent_list::PersistentList,
    persistent_vector::PersistentVector,
    porcelain::{SszHash, SszRead, SszReadDefault, SszSize, SszWrite},
    shared::{ContainerReader, ContainerWriter},
    size::{Size, BYTES_PER_LENGTH_OFFSET},
    uint256::Uint256,
};

mod basic;
mod bit_list;
mod bit_vector;
mod byte_list;
mod byte_vector;
mod contiguous_list;
mod contiguous_vector;
mod error;
mod hc;
mod node;
mod persistent_list;
mod persistent_vector;
mod porcelain;
mod shared;
mod size;
mod uint256;

pub mod merkle;
