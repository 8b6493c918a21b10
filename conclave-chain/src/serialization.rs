//! Canonical, consensus-critical serialization.
//!
//! This module defines two traits, [`ConclaveSerialize`] and
//! [`ConclaveDeserialize`], the analogs of Serde's `Serialize`/`Deserialize`
//! but for the fixed, hash-stable wire format described in spec.md §4.1:
//! transaction identity is `hash256` of this serialization, so every byte of
//! it is consensus-critical and the format itself never changes shape based
//! on a `serde` attribute.

mod error;
mod varint;

pub use error::SerializationError;
pub use varint::VarInt;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;

type Result<T> = std::result::Result<T, SerializationError>;

/// Writes `Self` in the canonical wire format described in spec.md §4.1.
pub trait ConclaveSerialize {
    fn conclave_serialize<W: io::Write>(&self, target: W) -> std::result::Result<(), io::Error>;

    fn conclave_serialize_to_vec(&self) -> std::result::Result<Vec<u8>, io::Error> {
        let mut data = Vec::new();
        self.conclave_serialize(&mut data)?;
        Ok(data)
    }
}

/// Reads `Self` back out of the canonical wire format.
pub trait ConclaveDeserialize: Sized {
    fn conclave_deserialize<R: io::Read>(reader: R) -> Result<Self>;
}

/// Helper for deserializing more succinctly via type inference, mirroring
/// the teacher's `BitcoinDeserializeInto`.
pub trait ConclaveDeserializeInto {
    fn conclave_deserialize_into<T: ConclaveDeserialize>(self) -> Result<T>;
}

impl<R: io::Read> ConclaveDeserializeInto for R {
    fn conclave_deserialize_into<T: ConclaveDeserialize>(self) -> Result<T> {
        T::conclave_deserialize(self)
    }
}

macro_rules! impl_int {
    ($ty:ty, $write:ident, $read:ident) => {
        impl ConclaveSerialize for $ty {
            fn conclave_serialize<W: io::Write>(
                &self,
                mut target: W,
            ) -> std::result::Result<(), io::Error> {
                target.$write::<LittleEndian>(*self)
            }
        }
        impl ConclaveDeserialize for $ty {
            fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
                Ok(reader.$read::<LittleEndian>()?)
            }
        }
    };
}

impl_int!(u16, write_u16, read_u16);
impl_int!(u32, write_u32, read_u32);
impl_int!(u64, write_u64, read_u64);
impl_int!(i32, write_i32, read_i32);
impl_int!(i64, write_i64, read_i64);

impl ConclaveSerialize for u8 {
    fn conclave_serialize<W: io::Write>(&self, mut target: W) -> std::result::Result<(), io::Error> {
        target.write_all(&[*self])
    }
}
impl ConclaveDeserialize for u8 {
    fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
        Ok(reader.read_u8()?)
    }
}

impl ConclaveSerialize for bool {
    fn conclave_serialize<W: io::Write>(&self, mut target: W) -> std::result::Result<(), io::Error> {
        target.write_all(&[*self as u8])
    }
}
impl ConclaveDeserialize for bool {
    fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerializationError::Parse("invalid bool")),
        }
    }
}

// Fixed-size byte arrays are written as-is (no length prefix).
macro_rules! impl_byte_array {
    ($size:expr) => {
        impl ConclaveSerialize for [u8; $size] {
            fn conclave_serialize<W: io::Write>(
                &self,
                mut target: W,
            ) -> std::result::Result<(), io::Error> {
                target.write_all(self)
            }
        }
        impl ConclaveDeserialize for [u8; $size] {
            fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
                let mut buf = [0u8; $size];
                reader.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    };
}

impl_byte_array!(20);
impl_byte_array!(32);
impl_byte_array!(33);
impl_byte_array!(65);

/// `Vec<T>`: varint count, then each element's serialization concatenated
/// (spec.md §4.1).
impl<T: ConclaveSerialize> ConclaveSerialize for Vec<T> {
    fn conclave_serialize<W: io::Write>(&self, mut target: W) -> std::result::Result<(), io::Error> {
        VarInt::from(self.len()).conclave_serialize(&mut target)?;
        for item in self.iter() {
            item.conclave_serialize(&mut target)?;
        }
        Ok(())
    }
}

impl<T: ConclaveDeserialize> ConclaveDeserialize for Vec<T> {
    fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
        let len = VarInt::conclave_deserialize(&mut reader)?.value() as usize;
        // Bound preallocation: a blindly-trusted length is a DOS vector.
        let mut result = Vec::with_capacity(std::cmp::min(len, 4096));
        for _ in 0..len {
            result.push(T::conclave_deserialize(&mut reader)?);
        }
        Ok(result)
    }
}

/// `Option<T>`: varint byte-length of the contained serialization (0 if
/// absent) followed by that serialization (spec.md §4.1). A present value
/// whose serialization happens to be empty is therefore indistinguishable
/// from absent, and is rejected on decode.
impl<T: ConclaveSerialize> ConclaveSerialize for Option<T> {
    fn conclave_serialize<W: io::Write>(&self, mut target: W) -> std::result::Result<(), io::Error> {
        match self {
            None => VarInt::from(0usize).conclave_serialize(&mut target),
            Some(value) => {
                let bytes = value
                    .conclave_serialize_to_vec()
                    .expect("serializing to a Vec is infallible");
                VarInt::from(bytes.len()).conclave_serialize(&mut target)?;
                target.write_all(&bytes)
            }
        }
    }
}

impl<T: ConclaveDeserialize> ConclaveDeserialize for Option<T> {
    fn conclave_deserialize<R: io::Read>(mut reader: R) -> Result<Self> {
        let len = VarInt::conclave_deserialize(&mut reader)?.value() as usize;
        if len == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let value = T::conclave_deserialize(&buf[..])?;
        Ok(Some(value))
    }
}
