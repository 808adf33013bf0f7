use easy_ext::ext;
use typenum::Unsigned;

#[ext(U64Ext)]
pub impl u64 {
    /// Number of levels in a binary Merkle tree with `self` leaves.
    ///
    /// `0_u64.ilog2_ceil()` is 0 by convention, matching a tree of a single chunk.
    fn ilog2_ceil(self) -> u8 {
        if self <= 1 {
            return 0;
        }

        let floor = u64::BITS - 1 - self.leading_zeros();
        let ceil = if self.is_power_of_two() {
            floor
        } else {
            floor + 1
        };

        ceil.try_into().expect("number of bits in u64 fits in u8")
    }

    fn prev_power_of_two(self) -> Self {
        if self.is_power_of_two() {
            self
        } else {
            (self / 2 + 1).next_power_of_two()
        }
    }

    fn div_round_up(self, divisor: Self) -> Self {
        (self + divisor - 1) / divisor
    }

    fn div_typenum<N: Unsigned>(self) -> Self {
        self / N::U64
    }

    fn mod_typenum<N: Unsigned>(self) -> Self {
        self % N::U64
    }
}

#[ext(UsizeExt)]
pub impl usize {
    fn ilog2_ceil(self) -> u8 {
        u64::try_from(self)
            .expect("usize fits in u64 on supported platforms")
            .ilog2_ceil()
    }

    fn div_round_up(self, divisor: Self) -> Self {
        (self + divisor - 1) / divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ilog2_ceil_matches_tree_depths() {
        assert_eq!(0_u64.ilog2_ceil(), 0);
        assert_eq!(1_u64.ilog2_ceil(), 0);
        assert_eq!(2_u64.ilog2_ceil(), 1);
        assert_eq!(3_u64.ilog2_ceil(), 2);
        assert_eq!(4_u64.ilog2_ceil(), 2);
        assert_eq!(5_u64.ilog2_ceil(), 3);
        assert_eq!((1_u64 << 40).ilog2_ceil(), 40);
    }

    #[test]
    fn prev_power_of_two_rounds_down() {
        assert_eq!(1_u64.prev_power_of_two(), 1);
        assert_eq!(2_u64.prev_power_of_two(), 2);
        assert_eq!(3_u64.prev_power_of_two(), 2);
        assert_eq!(1023_u64.prev_power_of_two(), 512);
    }

    #[test]
    fn div_round_up_covers_partial_chunks() {
        assert_eq!(0_usize.div_round_up(32), 0);
        assert_eq!(1_usize.div_round_up(32), 1);
        assert_eq!(32_usize.div_round_up(32), 1);
        assert_eq!(33_usize.div_round_up(32), 2);
    }
}
