pub mod altair;
pub mod bellatrix;
pub mod combined;
pub mod interrupt;
pub mod phase0;
pub mod unphased;
