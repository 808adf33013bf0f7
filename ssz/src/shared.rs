//! Offset-table plumbing shared by containers and variable-size collections.

use byteorder::{ByteOrder as _, LittleEndian};

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszRead, SszWrite},
    size::{Size, BYTES_PER_LENGTH_OFFSET},
};

pub(crate) fn read_offset(bytes: &[u8]) -> usize {
    LittleEndian::read_u32(bytes) as usize
}

pub(crate) fn write_offset(bytes: &mut [u8], offset: usize) -> Result<(), WriteError> {
    let offset_u32 =
        u32::try_from(offset).map_err(|_| WriteError::OffsetOverflow { offset })?;
    LittleEndian::write_u32(bytes, offset_u32);
    Ok(())
}

/// Sequential field decoder for SSZ containers.
///
/// Validates the offset table up front: the first offset must point at the end
/// of the fixed portion and offsets must be monotonic and in bounds.
pub struct ContainerReader<'bytes> {
    bytes: &'bytes [u8],
    fixed_cursor: usize,
    offsets: Vec<usize>,
    variable_cursor: usize,
}

impl<'bytes> ContainerReader<'bytes> {
    pub fn new(sizes: &[Size], bytes: &'bytes [u8]) -> Result<Self, ReadError> {
        let fixed_portion = Size::fixed_portion(sizes);

        if bytes.len() < fixed_portion {
            return Err(ReadError::TooShort {
                minimum: fixed_portion,
                actual: bytes.len(),
            });
        }

        let mut offsets = vec![];
        let mut cursor = 0;
        let mut previous = fixed_portion;

        for size in sizes {
            match size {
                Size::Fixed { size } => cursor += size,
                Size::Variable { .. } => {
                    let offset = read_offset(&bytes[cursor..cursor + BYTES_PER_LENGTH_OFFSET]);
                    let expected = if offsets.is_empty() {
                        offset == fixed_portion
                    } else {
                        previous <= offset
                    };

                    if !expected || offset > bytes.len() {
                        return Err(ReadError::OffsetInvalid {
                            offset,
                            previous,
                            length: bytes.len(),
                        });
                    }

                    offsets.push(offset);
                    previous = offset;
                    cursor += BYTES_PER_LENGTH_OFFSET;
                }
            }
        }

        if offsets.is_empty() && bytes.len() != fixed_portion {
            return Err(ReadError::WrongSize {
                expected: fixed_portion,
                actual: bytes.len(),
            });
        }

        offsets.push(bytes.len());

        Ok(Self {
            bytes,
            fixed_cursor: 0,
            offsets,
            variable_cursor: 0,
        })
    }

    pub fn read<C, T: SszRead<C>>(&mut self, context: &C) -> Result<T, ReadError> {
        match T::SIZE {
            Size::Fixed { size } => {
                let slice = &self.bytes[self.fixed_cursor..self.fixed_cursor + size];
                self.fixed_cursor += size;
                T::from_ssz_unchecked(context, slice)
            }
            Size::Variable { .. } => {
                let start = self.offsets[self.variable_cursor];
                let end = self.offsets[self.variable_cursor + 1];
                self.variable_cursor += 1;
                self.fixed_cursor += BYTES_PER_LENGTH_OFFSET;
                T::from_ssz_unchecked(context, &self.bytes[start..end])
            }
        }
    }
}

/// Sequential field encoder for SSZ containers.
pub struct ContainerWriter {
    fixed: Vec<u8>,
    variable: Vec<u8>,
    fixed_portion: usize,
}

impl ContainerWriter {
    #[must_use]
    pub fn new(fixed_portion: usize) -> Self {
        Self {
            fixed: Vec::with_capacity(fixed_portion),
            variable: vec![],
            fixed_portion,
        }
    }

    pub fn write<T: SszWrite>(&mut self, value: &T) -> Result<(), WriteError> {
        match T::SIZE {
            Size::Fixed { size } => {
                let start = self.fixed.len();
                self.fixed.resize(start + size, 0);
                value.write_fixed(&mut self.fixed[start..]);
            }
            Size::Variable { .. } => {
                let offset = self.fixed_portion + self.variable.len();
                let start = self.fixed.len();
                self.fixed.resize(start + BYTES_PER_LENGTH_OFFSET, 0);
                write_offset(&mut self.fixed[start..], offset)?;
                value.write_variable(&mut self.variable)?;
            }
        }

        Ok(())
    }

    pub fn finish(mut self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        debug_assert_eq!(self.fixed.len(), self.fixed_portion);

        bytes.append(&mut self.fixed);
        bytes.append(&mut self.variable);

        Ok(())
    }
}

/// Decodes the elements of an SSZ list or vector.
///
/// `expected_count` constrains the element count exactly (vectors);
/// `maximum_count` bounds it from above (lists).
pub(crate) fn read_elements<C, T: SszRead<C>>(
    context: &C,
    bytes: &[u8],
    expected_count: Option<usize>,
    maximum_count: usize,
) -> Result<Vec<T>, ReadError> {
    if bytes.is_empty() {
        if let Some(expected) = expected_count {
            if expected != 0 {
                return Err(ReadError::ElementCountMismatch {
                    expected,
                    actual: 0,
                });
            }
        }
        return Ok(vec![]);
    }

    match T::SIZE {
        Size::Fixed { size } => {
            if bytes.len() % size != 0 {
                return Err(ReadError::LengthNotMultiple {
                    length: bytes.len(),
                    element_size: size,
                });
            }

            let count = bytes.len() / size;
            validate_count(count, expected_count, maximum_count)?;

            bytes
                .chunks_exact(size)
                .map(|chunk| T::from_ssz_unchecked(context, chunk))
                .collect()
        }
        Size::Variable { .. } => {
            let first_offset = read_offset(
                bytes
                    .get(..BYTES_PER_LENGTH_OFFSET)
                    .ok_or(ReadError::TooShort {
                        minimum: BYTES_PER_LENGTH_OFFSET,
                        actual: bytes.len(),
                    })?,
            );

            if first_offset % BYTES_PER_LENGTH_OFFSET != 0 {
                return Err(ReadError::LengthNotMultiple {
                    length: first_offset,
                    element_size: BYTES_PER_LENGTH_OFFSET,
                });
            }

            let count = first_offset / BYTES_PER_LENGTH_OFFSET;
            validate_count(count, expected_count, maximum_count)?;

            if first_offset > bytes.len() {
                return Err(ReadError::OffsetInvalid {
                    offset: first_offset,
                    previous: 0,
                    length: bytes.len(),
                });
            }

            let mut offsets = Vec::with_capacity(count + 1);
            offsets.push(first_offset);

            for index in 1..count {
                let start = index * BYTES_PER_LENGTH_OFFSET;
                let offset = read_offset(&bytes[start..start + BYTES_PER_LENGTH_OFFSET]);

                if offset < offsets[index - 1] || offset > bytes.len() {
                    return Err(ReadError::OffsetInvalid {
                        offset,
                        previous: offsets[index - 1],
                        length: bytes.len(),
                    });
                }

                offsets.push(offset);
            }

            offsets.push(bytes.len());

            offsets
                .windows(2)
                .map(|window| T::from_ssz_unchecked(context, &bytes[window[0]..window[1]]))
                .collect()
        }
    }
}

fn validate_count(
    count: usize,
    expected_count: Option<usize>,
    maximum_count: usize,
) -> Result<(), ReadError> {
    if let Some(expected) = expected_count {
        if count != expected {
            return Err(ReadError::ElementCountMismatch {
                expected,
                actual: count,
            });
        }
    }

    if count > maximum_count {
        return Err(ReadError::TooLong {
            maximum: maximum_count,
            actual: count,
        });
    }

    Ok(())
}

/// Encodes the elements of an SSZ list or vector.
pub(crate) fn write_elements<'elements, T: SszWrite + 'elements>(
    bytes: &mut Vec<u8>,
    elements: impl IntoIterator<Item = &'elements T> + Clone,
) -> Result<(), WriteError> {
    match T::SIZE {
        Size::Fixed { size } => {
            for element in elements {
                let start = bytes.len();
                bytes.resize(start + size, 0);
                element.write_fixed(&mut bytes[start..]);
            }
        }
        Size::Variable { .. } => {
            let count = elements.clone().into_iter().count();
            let fixed_portion = count * BYTES_PER_LENGTH_OFFSET;
            let mut writer = ContainerWriter::new(fixed_portion);

            for element in elements {
                writer.write(element)?;
            }

            writer.finish(bytes)?;
        }
    }

    Ok(())
}
