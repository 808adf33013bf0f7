/// Per-validator participation bitset, one byte per validator.
pub type ParticipationFlags = u8;
