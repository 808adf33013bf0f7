//! Types that do not appear in consensus schemas but are used throughout.

use strum::Display;

/// Protocol fork. Ordering follows activation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
}

/// Epoch a committee assignment or attestation is relative to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationEpoch {
    Previous,
    Current,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered_by_activation() {
        assert!(Phase::Phase0 < Phase::Altair);
        assert!(Phase::Altair < Phase::Bellatrix);
        assert_eq!(Phase::Bellatrix.to_string(), "bellatrix");
    }
}
