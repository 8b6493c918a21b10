use super::{ConclaveDeserialize, ConclaveSerialize, SerializationError};
use byteorder::{LittleEndian, WriteBytesExt};

/// Bitcoin-style variable-length integer (spec.md §4.1).
///
/// One byte if `< 0xfd`; prefix `0xfd` + 2 LE bytes for `<= 0xffff`; prefix
/// `0xfe` + 4 LE bytes for `<= 0xffffffff`; prefix `0xff` + 8 LE bytes
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(u64);

impl VarInt {
    pub fn from(value: usize) -> VarInt {
        VarInt(value as u64)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number of bytes this value would occupy on the wire.
    pub fn size(value: usize) -> usize {
        if value < 0xfd {
            1
        } else if value <= 0xffff {
            3
        } else if value <= 0xffff_ffff {
            5
        } else {
            9
        }
    }
}

impl ConclaveSerialize for VarInt {
    fn conclave_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        if self.0 < 0xfd {
            target.write_all(&[self.0 as u8])
        } else if self.0 <= 0xffff {
            target.write_all(&[0xfd])?;
            target.write_u16::<LittleEndian>(self.0 as u16)
        } else if self.0 <= 0xffff_ffff {
            target.write_all(&[0xfe])?;
            target.write_u32::<LittleEndian>(self.0 as u32)
        } else {
            target.write_all(&[0xff])?;
            target.write_u64::<LittleEndian>(self.0)
        }
    }
}

impl ConclaveDeserialize for VarInt {
    fn conclave_deserialize<R: std::io::Read>(mut reader: R) -> Result<VarInt, SerializationError> {
        let first = u8::conclave_deserialize(&mut reader)?;
        match first {
            0xfd => Ok(VarInt(u16::conclave_deserialize(&mut reader)? as u64)),
            0xfe => Ok(VarInt(u32::conclave_deserialize(&mut reader)? as u64)),
            0xff => Ok(VarInt(u64::conclave_deserialize(&mut reader)?)),
            small => Ok(VarInt(small as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn roundtrip_any_value(value in any::<u64>()) {
            let v = VarInt(value);
            let bytes = v.conclave_serialize_to_vec().unwrap();
            let back = VarInt::conclave_deserialize(&bytes[..]).unwrap();
            prop_assert_eq!(back.value(), value);
        }
    }

    #[test]
    fn roundtrip_boundaries() {
        for value in [0usize, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000] {
            let v = VarInt::from(value);
            let bytes = v.conclave_serialize_to_vec().unwrap();
            assert_eq!(bytes.len(), VarInt::size(value));
            let back = VarInt::conclave_deserialize(&bytes[..]).unwrap();
            assert_eq!(back.value(), value as u64);
        }
    }
}
