// Sequential, byte-order aware reading of FARM primitives.

use crate::error::{FarmError, Result};
use log::debug;
use std::fmt;

/// Byte order of every multi-byte field after the two-byte marker.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// The value the marker field holds once it has been read in this order.
    pub fn marker(&self) -> u16 {
        match self {
            ByteOrder::Little => 1,
            ByteOrder::Big => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::Little => "LITTLE_ENDIAN",
            ByteOrder::Big => "BIG_ENDIAN",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A 16-byte UUID, stored in canonical (RFC 4122) byte order regardless of the file's order.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Uuid([u8; 16]);

impl Uuid {
    pub fn from_bytes(bytes: [u8; 16]) -> Uuid {
        Uuid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i == 4 || i == 6 || i == 8 || i == 10 {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Describes a type that can be used with DataReader::read().
///
/// This lets generic helpers such as read_vec() pull any primitive out of the stream in the
/// session's byte order.
pub trait Readable: Sized {
    fn read(reader: &mut DataReader) -> Result<Self>;
}

impl Readable for u8 {
    fn read(reader: &mut DataReader) -> Result<u8> {
        reader.read_u8()
    }
}

impl Readable for u16 {
    fn read(reader: &mut DataReader) -> Result<u16> {
        reader.read_u16()
    }
}

impl Readable for i32 {
    fn read(reader: &mut DataReader) -> Result<i32> {
        reader.read_i32()
    }
}

impl Readable for i64 {
    fn read(reader: &mut DataReader) -> Result<i64> {
        reader.read_i64()
    }
}

impl Readable for f64 {
    fn read(reader: &mut DataReader) -> Result<f64> {
        reader.read_f64()
    }
}

impl Readable for bool {
    fn read(reader: &mut DataReader) -> Result<bool> {
        reader.read_bool()
    }
}

/// This is a wrapper around a byte slice that keeps a position and enables easy parsing.
///
/// Reads never look ahead or behind the current position, except detect_byte_order(), which
/// peeks at the marker without consuming it. Running off the end is an UnexpectedEof error,
/// never a panic.
pub struct DataReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> DataReader<'a> {
    /// Creates a little-endian reader over the given slice, positioned at the beginning.
    pub fn new(data: &'a [u8]) -> DataReader<'a> {
        DataReader {
            data,
            pos: 0,
            order: ByteOrder::Little,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Inspects the two marker bytes at the current position and configures the byte order.
    ///
    /// `01 00` selects little-endian and `00 00` big-endian. The bytes are not consumed: the
    /// caller reads the marker next, through the order chosen here.
    pub fn detect_byte_order(&mut self) -> Result<ByteOrder> {
        let offset = self.pos;
        let available = self.remaining();
        if available < 2 {
            return Err(FarmError::UnexpectedEof {
                offset,
                requested: 2,
                available,
            });
        }
        let found = [self.data[offset], self.data[offset + 1]];
        let order = match found {
            [1, 0] => ByteOrder::Little,
            [0, 0] => ByteOrder::Big,
            _ => return Err(FarmError::InvalidByteOrderMarker { offset, found }),
        };
        debug!("Detected {} from marker bytes {:02x?}.", order, found);
        self.set_byte_order(order);
        Ok(order)
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Consumes the next n bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(FarmError::UnexpectedEof {
                offset: self.pos,
                requested: n,
                available,
            });
        }
        let data: &'a [u8] = self.data;
        let result = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(result)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut raw = [0u8; N];
        raw.copy_from_slice(self.take(N)?);
        Ok(raw)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let raw = self.take_array()?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let raw = self.take_array()?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let raw = self.take_array()?;
        Ok(match self.order {
            ByteOrder::Little => i32::from_le_bytes(raw),
            ByteOrder::Big => i32::from_be_bytes(raw),
        })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let raw = self.take_array()?;
        Ok(match self.order {
            ByteOrder::Little => i64::from_le_bytes(raw),
            ByteOrder::Big => i64::from_be_bytes(raw),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let raw = self.take_array()?;
        Ok(match self.order {
            ByteOrder::Little => f64::from_le_bytes(raw),
            ByteOrder::Big => f64::from_be_bytes(raw),
        })
    }

    /// Reads a single byte; anything non-zero is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a UUID whose first three fields (u32, u16, u16) follow the session byte order
    /// and whose last eight bytes are raw.
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.read_u32()?.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.read_u16()?.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.read_u16()?.to_be_bytes());
        bytes[8..16].copy_from_slice(self.take(8)?);
        Ok(Uuid(bytes))
    }

    /// Reads a u16 length, that many UTF-8 bytes, and one pad byte if the length is odd.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|source| FarmError::InvalidString { offset, source })?;
        if len % 2 == 1 {
            // Strings keep the stream 2-byte aligned.
            self.skip(1)?;
        }
        Ok(String::from(s))
    }

    pub fn read<T: Readable>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Reads count consecutive values of T.
    pub fn read_vec<T: Readable>(&mut self, count: usize) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            out.push(self.read()?);
        }
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n)?;
        Ok(())
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn u16_honors_byte_order() {
        let input: [u8; 4] = [1, 2, 1, 2];
        let mut reader = DataReader::new(&input);
        assert_eq!(0x0201, reader.read_u16().unwrap());
        reader.set_byte_order(ByteOrder::Big);
        assert_eq!(0x0102, reader.read_u16().unwrap());
        assert!(reader.done());
    }

    #[test]
    fn signed_and_float_values() {
        let mut input = vec![];
        input.extend_from_slice(&(-7i32).to_be_bytes());
        input.extend_from_slice(&(-1_000_000_000_000i64).to_be_bytes());
        input.extend_from_slice(&2.5f64.to_be_bytes());
        let mut reader = DataReader::new(&input);
        reader.set_byte_order(ByteOrder::Big);
        assert_eq!(-7, reader.read::<i32>().unwrap());
        assert_eq!(-1_000_000_000_000, reader.read::<i64>().unwrap());
        assert_eq!(2.5, reader.read::<f64>().unwrap());
        assert_eq!(20, reader.position());
    }

    #[test]
    fn short_read_reports_offset_and_sizes() {
        let input: [u8; 3] = [0, 0, 9];
        let mut reader = DataReader::new(&input);
        reader.read_u16().unwrap();
        match reader.read_i32() {
            Err(FarmError::UnexpectedEof {
                offset,
                requested,
                available,
            }) => {
                assert_eq!(2, offset);
                assert_eq!(4, requested);
                assert_eq!(1, available);
            }
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
        // A failed read doesn't move the cursor.
        assert_eq!(2, reader.position());
    }

    #[test]
    fn odd_length_string_consumes_pad_byte() {
        #[rustfmt::skip]
        let input: [u8; 8] = [
            3, 0, b'A', b'V', b'E', 0xee,  // length 3, "AVE", pad
            7, 0,  // next field
        ];
        let mut reader = DataReader::new(&input);
        assert_eq!("AVE", reader.read_string().unwrap());
        assert_eq!(6, reader.position());
        assert_eq!(7, reader.read_u16().unwrap());
    }

    #[test]
    fn even_length_string_has_no_pad() {
        let input: [u8; 8] = [4, 0, b'R', b'O', b'A', b'D', 7, 0];
        let mut reader = DataReader::new(&input);
        assert_eq!("ROAD", reader.read_string().unwrap());
        assert_eq!(7, reader.read_u16().unwrap());
    }

    #[test]
    fn empty_string() {
        let input: [u8; 2] = [0, 0];
        let mut reader = DataReader::new(&input);
        assert_eq!("", reader.read_string().unwrap());
        assert!(reader.done());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let input: [u8; 4] = [2, 0, 0xff, 0xfe];
        let mut reader = DataReader::new(&input);
        assert!(matches!(
            reader.read_string(),
            Err(FarmError::InvalidString { offset: 2, .. })
        ));
    }

    #[test]
    fn missing_pad_byte_at_end_is_eof() {
        let input: [u8; 5] = [3, 0, b'A', b'V', b'E'];
        let mut reader = DataReader::new(&input);
        assert!(matches!(
            reader.read_string(),
            Err(FarmError::UnexpectedEof { offset: 5, .. })
        ));
    }

    #[test]
    fn detect_does_not_consume_marker() {
        let input: [u8; 4] = [1, 0, 0, 8];
        let mut reader = DataReader::new(&input);
        reader.set_byte_order(ByteOrder::Big);
        assert_eq!(ByteOrder::Little, reader.detect_byte_order().unwrap());
        assert_eq!(0, reader.position());
        assert_eq!(1, reader.read_u16().unwrap());
        assert_eq!(0x0800, reader.read_u16().unwrap());

        let input: [u8; 4] = [0, 0, 0, 8];
        let mut reader = DataReader::new(&input);
        assert_eq!(ByteOrder::Big, reader.detect_byte_order().unwrap());
        assert_eq!(0, reader.read_u16().unwrap());
        assert_eq!(8, reader.read_u16().unwrap());
    }

    #[test]
    fn detect_rejects_other_markers() {
        for bad in [[2u8, 0u8], [0, 1], [1, 1], [0xff, 0xff]] {
            let mut reader = DataReader::new(&bad);
            match reader.detect_byte_order() {
                Err(FarmError::InvalidByteOrderMarker { offset, found }) => {
                    assert_eq!(0, offset);
                    assert_eq!(bad, found);
                }
                other => panic!("expected InvalidByteOrderMarker, got {:?}", other),
            }
        }
        let mut reader = DataReader::new(&[1u8]);
        assert!(matches!(
            reader.detect_byte_order(),
            Err(FarmError::UnexpectedEof { requested: 2, .. })
        ));
    }

    #[test]
    fn uuid_is_normalized() {
        #[rustfmt::skip]
        let le: [u8; 16] = [
            0x00, 0x84, 0x0e, 0x55,  // time_low, little-endian
            0x9b, 0xe2,  // time_mid
            0xd4, 0x41,  // time_hi_and_version
            0xa7, 0x16, 0x44, 0x66, 0x55, 0x44, 0x00, 0x00,
        ];
        let mut reader = DataReader::new(&le);
        let uuid = reader.read_uuid().unwrap();
        assert_eq!("550e8400-e29b-41d4-a716-446655440000", uuid.to_string());

        let mut be = le;
        be[0..4].reverse();
        be[4..6].reverse();
        be[6..8].reverse();
        let mut reader = DataReader::new(&be);
        reader.set_byte_order(ByteOrder::Big);
        assert_eq!(uuid, reader.read_uuid().unwrap());
    }

    #[test]
    fn read_vec_and_skip() {
        let input: [u8; 7] = [5, 0, 9, 0, 0xaa, 2, 0];
        let mut reader = DataReader::new(&input);
        assert_eq!(vec![5u16, 9], reader.read_vec::<u16>(2).unwrap());
        reader.skip(1).unwrap();
        assert_eq!(vec![2u16], reader.read_vec::<u16>(1).unwrap());
        assert!(reader.skip(1).is_err());
        assert!(reader.read_bool().is_err());
    }
}
