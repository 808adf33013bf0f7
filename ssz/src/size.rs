pub const BYTES_PER_LENGTH_OFFSET: usize = 4;

/// Serialized size of an SSZ type as determined by its schema.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Size {
    Fixed { size: usize },
    Variable { minimum_size: usize },
}

impl Size {
    pub const ZERO: Self = Self::Fixed { size: 0 };

    #[must_use]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// Contribution of a field of this size to the fixed portion of a container.
    #[must_use]
    pub const fn fixed_part(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { .. } => BYTES_PER_LENGTH_OFFSET,
        }
    }

    #[must_use]
    pub const fn minimum(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { minimum_size } => minimum_size,
        }
    }

    /// Size of a container with fields of the given sizes, in schema order.
    #[must_use]
    pub const fn aggregate(sizes: &[Self]) -> Self {
        let mut index = 0;
        let mut minimum = 0;
        let mut any_variable = false;

        while index < sizes.len() {
            match sizes[index] {
                Self::Fixed { size } => minimum += size,
                Self::Variable { minimum_size } => {
                    minimum += BYTES_PER_LENGTH_OFFSET + minimum_size;
                    any_variable = true;
                }
            }
            index += 1;
        }

        if any_variable {
            Self::Variable {
                minimum_size: minimum,
            }
        } else {
            Self::Fixed { size: minimum }
        }
    }

    /// Length of the fixed portion (inline fields and offsets) of a container.
    #[must_use]
    pub const fn fixed_portion(sizes: &[Self]) -> usize {
        let mut index = 0;
        let mut length = 0;

        while index < sizes.len() {
            length += sizes[index].fixed_part();
            index += 1;
        }

        length
    }

    /// Size of a vector of `count` elements of this size.
    #[must_use]
    pub const fn of_vector(element: Self, count: usize) -> Self {
        match element {
            Self::Fixed { size } => Self::Fixed { size: size * count },
            Self::Variable { minimum_size } => Self::Variable {
                minimum_size: (BYTES_PER_LENGTH_OFFSET + minimum_size) * count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_of_fixed_fields_is_fixed() {
        let size = Size::aggregate(&[Size::Fixed { size: 8 }, Size::Fixed { size: 32 }]);
        assert_eq!(size, Size::Fixed { size: 40 });
    }

    #[test]
    fn aggregate_with_variable_field_counts_offsets() {
        let size = Size::aggregate(&[
            Size::Fixed { size: 8 },
            Size::Variable { minimum_size: 0 },
            Size::Fixed { size: 32 },
        ]);
        assert_eq!(size, Size::Variable { minimum_size: 44 });

        let sizes = [
            Size::Fixed { size: 8 },
            Size::Variable { minimum_size: 0 },
            Size::Fixed { size: 32 },
        ];
        assert_eq!(Size::fixed_portion(&sizes), 44);
    }
}
