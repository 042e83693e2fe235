// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Versioned binary serialization.
//!
//! Every record starts with a data version tag. Writers always emit the
//! latest layout, field by field in declaration order. Readers carry the
//! version they found and gate every field that was added later with
//! [`VersionedReader::read_since`], so files written by older firmware load
//! with defaults for the fields they never had.
//!
//! All multi-byte fields are little-endian.

mod field;
mod version;

pub use field::Field;
pub use version::{DataVersion, ProjectVersion};

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// FNV-1a offset basis
const HASH_SEED: u32 = 0x811c_9dc5;
/// FNV-1a prime
const HASH_PRIME: u32 = 0x0100_0193;

/// Fold `bytes` into a running FNV-1a hash
fn hash_update(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(HASH_PRIME);
    }
    hash
}

/// Stream adapter hashing every byte passing through
struct Hashed<T> {
    inner: T,
    hash: u32,
}

impl<T> Hashed<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            hash: HASH_SEED,
        }
    }
}

impl<W: Write> Write for Hashed<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hash = hash_update(self.hash, &buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<R: Read> Read for Hashed<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hash = hash_update(self.hash, &buf[..n]);
        Ok(n)
    }
}

/// Writer emitting the latest data version
pub struct VersionedWriter<W: Write> {
    out: Hashed<W>,
}

impl<W: Write> VersionedWriter<W> {
    /// Create a writer and emit the version tag
    pub fn new(inner: W) -> io::Result<Self> {
        let mut writer = Self {
            out: Hashed::new(inner),
        };
        writer.write(&ProjectVersion::LATEST)?;
        Ok(writer)
    }

    /// Version this writer produces
    pub fn data_version(&self) -> DataVersion {
        ProjectVersion::LATEST
    }

    /// Write one field
    pub fn write<T: Field>(&mut self, value: &T) -> io::Result<()> {
        value.write_to(&mut self.out)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    /// Append the hash of everything written so far
    pub fn write_hash(&mut self) -> io::Result<()> {
        let hash = self.out.hash;
        self.out.inner.write_u32::<LittleEndian>(hash)
    }

    /// Flush and return the underlying stream
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out.inner)
    }
}

/// Reader tracking the data version of the record being read
pub struct VersionedReader<R: Read> {
    input: Hashed<R>,
    data_version: DataVersion,
}

impl<R: Read> VersionedReader<R> {
    /// Create a reader and consume the version tag
    pub fn new(inner: R) -> io::Result<Self> {
        let mut input = Hashed::new(inner);
        let data_version = DataVersion::read_from(&mut input)?;
        Ok(Self {
            input,
            data_version,
        })
    }

    /// Create a reader for a stream without a version tag
    pub fn with_version(inner: R, data_version: DataVersion) -> Self {
        Self {
            input: Hashed::new(inner),
            data_version,
        }
    }

    /// Version of the data being read
    pub fn data_version(&self) -> DataVersion {
        self.data_version
    }

    /// Read a field present in every version
    pub fn read<T: Field>(&mut self, value: &mut T) -> io::Result<()> {
        *value = T::read_from(&mut self.input)?;
        Ok(())
    }

    /// Read a field introduced in `since`.
    ///
    /// Older data does not contain the field: nothing is consumed and
    /// `value` keeps its current (default) content.
    pub fn read_since<T: Field>(&mut self, value: &mut T, since: DataVersion) -> io::Result<()> {
        if self.data_version >= since {
            self.read(value)
        } else {
            Ok(())
        }
    }

    /// Read a field stored as the narrower type `S` and widen it
    pub fn read_as<S: Field, T: From<S>>(&mut self, value: &mut T) -> io::Result<()> {
        *value = T::from(S::read_from(&mut self.input)?);
        Ok(())
    }

    /// Read raw bytes
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.input.read_exact(buf)
    }

    /// Read the trailing hash and compare it with the bytes consumed so far
    pub fn check_hash(&mut self) -> io::Result<bool> {
        let expected = self.input.hash;
        let stored = self.input.inner.read_u32::<LittleEndian>()?;
        Ok(expected == stored)
    }
}

/// An entity with a versioned binary form
pub trait Persist {
    /// Write the entity at the latest version
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()>;

    /// Read the entity, honoring the reader's data version
    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()>;
}

/// Write every element in index order, without a length prefix
pub fn write_array<T: Persist, W: Write>(
    writer: &mut VersionedWriter<W>,
    items: &[T],
) -> io::Result<()> {
    for item in items {
        item.write(writer)?;
    }
    Ok(())
}

/// Read every element in index order, without a length prefix
pub fn read_array<T: Persist, R: Read>(
    reader: &mut VersionedReader<R>,
    items: &mut [T],
) -> io::Result<()> {
    for item in items.iter_mut() {
        item.read(reader)?;
    }
    Ok(())
}

/// Encode an entity into a tagged byte buffer
pub fn to_bytes<T: Persist>(value: &T) -> io::Result<Vec<u8>> {
    let mut writer = VersionedWriter::new(Vec::new())?;
    value.write(&mut writer)?;
    writer.into_inner()
}

/// Decode a tagged byte buffer into `value`, returning the version found
pub fn from_bytes<T: Persist>(bytes: &[u8], value: &mut T) -> io::Result<DataVersion> {
    let mut reader = VersionedReader::new(bytes)?;
    value.read(&mut reader)?;
    Ok(reader.data_version())
}
