// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fixed-size fields of the binary format.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::types::ModelEnum;

/// A value with a fixed little-endian encoding
pub trait Field: Sized {
    /// Encode the value
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()>;

    /// Decode a value
    fn read_from<R: Read>(input: &mut R) -> io::Result<Self>;
}

impl Field for u8 {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        input.read_u8()
    }
}

impl Field for i8 {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_i8(*self)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        input.read_i8()
    }
}

impl Field for bool {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(*self as u8)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        Ok(input.read_u8()? != 0)
    }
}

macro_rules! le_field {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Field for $ty {
            fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
                out.$write::<LittleEndian>(*self)
            }

            fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
                input.$read::<LittleEndian>()
            }
        }
    };
}

le_field!(u16, write_u16, read_u16);
le_field!(i16, write_i16, read_i16);
le_field!(u32, write_u32, read_u32);
le_field!(i32, write_i32, read_i32);
le_field!(f32, write_f32, read_f32);

/// Fixed-length byte strings (names)
impl<const N: usize> Field for [u8; N] {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; N];
        input.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Model enums are stored as their `u8` index; unknown indices clamp
impl<T: ModelEnum> Field for T {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(self.index() as u8)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        Ok(T::from_index(input.read_u8()? as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunMode;

    fn encode<T: Field>(value: T) -> Vec<u8> {
        let mut buf = Vec::new();
        value.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_little_endian_layout() {
        assert_eq!(encode(0x1234u16), vec![0x34, 0x12]);
        assert_eq!(encode(-2i32), vec![0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(encode(true), vec![1]);
    }

    #[test]
    fn test_enum_field() {
        assert_eq!(encode(RunMode::Pendulum), vec![2]);
        let decoded = RunMode::read_from(&mut &[200u8][..]).unwrap();
        assert_eq!(decoded, RunMode::RandomWalk);
    }

    #[test]
    fn test_name_field() {
        let name = *b"INIT\0\0\0\0";
        let bytes = encode(name);
        assert_eq!(<[u8; 8]>::read_from(&mut &bytes[..]).unwrap(), name);
    }
}
