//! Tagged-record decoder for the note-body archive.
//!
//! An archive is a flat run of records. Each record is a header byte
//! (`field << 3 | tag`) followed by a payload whose shape depends on the tag:
//!
//! | tag | payload |
//! |-----|---------|
//! | 0   | LEB128 varint, must fit in `i32` |
//! | 2   | varint length, then that many raw bytes |
//! | 5   | 4-byte little-endian `f32` |
//!
//! There is no end marker; a stream ends with its buffer. Byte payloads are
//! not interpreted here: the caller decides whether they hold UTF-8 text or a
//! nested record stream, and opens the latter with [`Record::open`].

use crate::error::DecodeFault;
use std::borrow::Cow;

const TAG_INTEGER: u8 = 0;
const TAG_BYTES: u8 = 2;
const TAG_FLOAT: u8 = 5;

/// A varint never needs more than 10 bytes for 64 bits.
const MAX_VARINT_BYTES: usize = 10;

/// The typed payload of a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Integer(i32),
    Float(f32),
    Bytes(&'a [u8]),
}

/// One decoded `(field, value)` unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    pub field: u32,
    pub value: Value<'a>,
    /// Absolute offset of the header byte in the root buffer.
    pub offset: usize,
    /// Absolute offset of the first payload byte.
    payload_offset: usize,
}

impl<'a> Record<'a> {
    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|v| v != 0)
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.value {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte payload as text. Invalid UTF-8 is replaced, not rejected.
    pub fn as_str(&self) -> Option<Cow<'a, str>> {
        self.as_bytes().map(String::from_utf8_lossy)
    }

    /// Opens the byte payload as a nested record stream borrowing the same
    /// buffer.
    pub fn open(&self) -> Option<RecordStream<'a>> {
        self.as_bytes()
            .map(|bytes| RecordStream::nested(bytes, self.payload_offset))
    }
}

/// A forward-only cursor over a borrowed record buffer.
///
/// After a [`DecodeFault`] the stream is fused: every later read returns
/// `Ok(None)` without touching the buffer again.
#[derive(Debug, Clone)]
pub struct RecordStream<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of `buf[0]` inside the root buffer.
    base: usize,
    fused: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::nested(buf, 0)
    }

    fn nested(buf: &'a [u8], base: usize) -> Self {
        Self {
            buf,
            pos: 0,
            base,
            fused: false,
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.fused || self.pos >= self.buf.len()
    }

    /// Reads the next record, or `Ok(None)` at the end of the buffer.
    pub fn next_record(&mut self) -> Result<Option<Record<'a>>, DecodeFault> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let result = self.read_record();
        if result.is_err() {
            self.fused = true;
        }
        result.map(Some)
    }

    fn read_record(&mut self) -> Result<Record<'a>, DecodeFault> {
        let offset = self.base + self.pos;
        let header = self.buf[self.pos];
        self.pos += 1;

        let field = u32::from(header >> 3);
        let value = match header & 0x07 {
            TAG_INTEGER => {
                let raw = self.read_varint(offset)?;
                // Negative values arrive sign-extended to 64 bits.
                let v = i32::try_from(raw as i64)
                    .map_err(|_| DecodeFault::IntegerOverflow { offset })?;
                Value::Integer(v)
            }
            TAG_FLOAT => {
                let bytes = self.take(4, offset)?;
                let bits = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Value::Float(f32::from_bits(bits))
            }
            TAG_BYTES => {
                let len = self.read_varint(offset)?;
                let len = usize::try_from(len).map_err(|_| DecodeFault::Truncated { offset })?;
                let payload_offset = self.base + self.pos;
                let bytes = self.take(len, offset)?;
                return Ok(Record {
                    field,
                    value: Value::Bytes(bytes),
                    offset,
                    payload_offset,
                });
            }
            tag => return Err(DecodeFault::UnknownTag { offset, tag }),
        };

        Ok(Record {
            field,
            value,
            offset,
            payload_offset: offset + 1,
        })
    }

    fn read_varint(&mut self, offset: usize) -> Result<u64, DecodeFault> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let Some(&c) = self.buf.get(self.pos) else {
                return Err(DecodeFault::Truncated { offset });
            };
            self.pos += 1;
            value |= u64::from(c & 0x7f) << (7 * i);
            if c & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeFault::IntegerOverflow { offset })
    }

    fn take(&mut self, len: usize, offset: usize) -> Result<&'a [u8], DecodeFault> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DecodeFault::Truncated { offset })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

impl<'a> Iterator for RecordStream<'a> {
    type Item = Result<Record<'a>, DecodeFault>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let b = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(b);
                return;
            }
            out.push(b | 0x80);
        }
    }

    fn int_record(field: u8, v: i32) -> Vec<u8> {
        let mut out = vec![field << 3];
        varint(v as i64 as u64, &mut out);
        out
    }

    #[test]
    fn header_splits_field_and_tag() {
        let mut stream = RecordStream::new(&[0x08, 0x2a]);
        let rec = stream.next_record().unwrap().unwrap();
        assert_eq!(rec.field, 1);
        assert_eq!(rec.value, Value::Integer(42));
        assert_eq!(stream.next_record().unwrap(), None);
    }

    #[test]
    fn varint_round_trips_across_byte_boundaries() {
        let samples = [
            0,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            2_097_151,
            2_097_152,
            268_435_455,
            268_435_456,
            i32::MAX,
        ];
        for n in samples {
            let bytes = int_record(3, n);
            let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
            assert_eq!(rec.as_int(), Some(n), "value {n}");
        }
    }

    #[test]
    fn negative_integers_use_sign_extension() {
        let bytes = int_record(2, -1);
        assert_eq!(bytes.len(), 11);
        let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
        assert_eq!(rec.as_int(), Some(-1));
    }

    #[test]
    fn integer_beyond_i32_is_overflow() {
        let mut bytes = vec![0x08];
        varint(1 << 31, &mut bytes);
        let mut stream = RecordStream::new(&bytes);
        assert_eq!(
            stream.next_record(),
            Err(DecodeFault::IntegerOverflow { offset: 0 })
        );
        assert_eq!(stream.next_record(), Ok(None));
    }

    #[test]
    fn eleven_byte_varint_is_overflow() {
        let mut bytes = vec![0x08];
        bytes.extend([0xff; 11]);
        let err = RecordStream::new(&bytes).next_record().unwrap_err();
        assert_eq!(err, DecodeFault::IntegerOverflow { offset: 0 });
    }

    #[test]
    fn float_bits_survive_exactly() {
        for bits in [0u32, 0x3f80_0000, 0x4140_0000, 0x8000_0000, 0x7fc0_0001, 0xff80_0000, 1] {
            let mut bytes = vec![(4 << 3) | 5];
            bytes.extend(bits.to_le_bytes());
            let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
            assert_eq!(rec.field, 4);
            assert_eq!(rec.as_float().unwrap().to_bits(), bits);
        }
    }

    #[test]
    fn bytes_payload_opens_as_nested_stream() {
        let inner = int_record(1, 5);
        let mut bytes = vec![(2 << 3) | 2, inner.len() as u8];
        bytes.extend(&inner);
        bytes.extend(int_record(3, 9));

        let mut outer = RecordStream::new(&bytes);
        let rec = outer.next_record().unwrap().unwrap();
        let mut nested = rec.open().unwrap();
        assert_eq!(nested.position(), 2);
        assert_eq!(nested.next_record().unwrap().unwrap().as_int(), Some(5));
        assert_eq!(nested.next_record().unwrap(), None);
        assert_eq!(outer.next_record().unwrap().unwrap().as_int(), Some(9));
    }

    #[test]
    fn unknown_tag_reports_offset_and_stops() {
        let bytes = [0x08, 0x01, (1 << 3) | 3, 0x08, 0x01];
        let mut stream = RecordStream::new(&bytes);
        stream.next_record().unwrap();
        assert_eq!(
            stream.next_record(),
            Err(DecodeFault::UnknownTag { offset: 2, tag: 3 })
        );
        assert_eq!(stream.position(), 3);
        assert_eq!(stream.next_record(), Ok(None));
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn truncated_payloads_are_faults() {
        let cases: [&[u8]; 3] = [&[0x08, 0x80], &[0x0d, 0x00, 0x00], &[0x0a, 0x05, b'a']];
        for bytes in cases {
            let err = RecordStream::new(bytes).next_record().unwrap_err();
            assert_eq!(err, DecodeFault::Truncated { offset: 0 });
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes = [0x0a, 0x02, 0xff, b'a'];
        let rec = RecordStream::new(&bytes).next_record().unwrap().unwrap();
        assert_eq!(rec.as_str().unwrap(), "\u{fffd}a");
    }

    #[test]
    fn iterator_yields_until_exhausted() {
        let mut bytes = int_record(1, 1);
        bytes.extend(int_record(2, 2));
        let fields: Vec<u32> = RecordStream::new(&bytes)
            .map(|r| r.unwrap().field)
            .collect();
        assert_eq!(fields, vec![1, 2]);
    }
}
