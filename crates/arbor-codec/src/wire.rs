//! MessagePack reading and writing for [`Value`] trees.
//!
//! The writer always picks the most compact representation. The reader
//! accepts every form the writer can emit and rejects extension types,
//! truncated input and trailing bytes.

use bytes::{Buf, BufMut};

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Maximum nesting depth accepted by the reader.
pub const MAX_DEPTH: usize = 512;

mod marker {
    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;

    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xa0;
    pub const NEGATIVE_FIXINT: u8 = 0xe0;
}

/// Encode a value tree to bytes.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(buf)
}

/// Write a value tree into `buf`.
pub fn write_value<B: BufMut>(buf: &mut B, value: &Value) -> CodecResult<()> {
    match value {
        Value::Nil => buf.put_u8(marker::NIL),
        Value::Bool(false) => buf.put_u8(marker::FALSE),
        Value::Bool(true) => buf.put_u8(marker::TRUE),
        Value::Int(i) if *i >= 0 => write_uint(buf, *i as u64),
        Value::Int(i) => write_negative(buf, *i),
        Value::UInt(u) => write_uint(buf, *u),
        Value::Float(f) => {
            buf.put_u8(marker::FLOAT32);
            buf.put_f32(*f);
        }
        Value::Double(f) => {
            buf.put_u8(marker::FLOAT64);
            buf.put_f64(*f);
        }
        Value::String(s) => {
            let len = s.len();
            if len < 32 {
                buf.put_u8(marker::FIXSTR | len as u8);
            } else if len <= u8::MAX as usize {
                buf.put_u8(marker::STR8);
                buf.put_u8(len as u8);
            } else {
                write_len(buf, len, marker::STR16, marker::STR32)?;
            }
            buf.put_slice(s.as_bytes());
        }
        Value::Binary(b) => {
            let len = b.len();
            if len <= u8::MAX as usize {
                buf.put_u8(marker::BIN8);
                buf.put_u8(len as u8);
            } else {
                write_len(buf, len, marker::BIN16, marker::BIN32)?;
            }
            buf.put_slice(b);
        }
        Value::Array(items) => {
            if items.len() < 16 {
                buf.put_u8(marker::FIXARRAY | items.len() as u8);
            } else {
                write_len(buf, items.len(), marker::ARRAY16, marker::ARRAY32)?;
            }
            for item in items {
                write_value(buf, item)?;
            }
        }
        Value::Map(entries) => {
            if entries.len() < 16 {
                buf.put_u8(marker::FIXMAP | entries.len() as u8);
            } else {
                write_len(buf, entries.len(), marker::MAP16, marker::MAP32)?;
            }
            for (k, v) in entries {
                write_value(buf, k)?;
                write_value(buf, v)?;
            }
        }
    }
    Ok(())
}

fn write_uint<B: BufMut>(buf: &mut B, u: u64) {
    if u < 0x80 {
        buf.put_u8(u as u8);
    } else if u <= u8::MAX as u64 {
        buf.put_u8(marker::UINT8);
        buf.put_u8(u as u8);
    } else if u <= u16::MAX as u64 {
        buf.put_u8(marker::UINT16);
        buf.put_u16(u as u16);
    } else if u <= u32::MAX as u64 {
        buf.put_u8(marker::UINT32);
        buf.put_u32(u as u32);
    } else {
        buf.put_u8(marker::UINT64);
        buf.put_u64(u);
    }
}

fn write_negative<B: BufMut>(buf: &mut B, i: i64) {
    if i >= -32 {
        buf.put_i8(i as i8);
    } else if i >= i8::MIN as i64 {
        buf.put_u8(marker::INT8);
        buf.put_i8(i as i8);
    } else if i >= i16::MIN as i64 {
        buf.put_u8(marker::INT16);
        buf.put_i16(i as i16);
    } else if i >= i32::MIN as i64 {
        buf.put_u8(marker::INT32);
        buf.put_i32(i as i32);
    } else {
        buf.put_u8(marker::INT64);
        buf.put_i64(i);
    }
}

fn write_len<B: BufMut>(buf: &mut B, len: usize, m16: u8, m32: u8) -> CodecResult<()> {
    if len <= u16::MAX as usize {
        buf.put_u8(m16);
        buf.put_u16(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(m32);
        buf.put_u32(len as u32);
    } else {
        return Err(CodecError::TooLarge { len });
    }
    Ok(())
}

/// Decode exactly one value tree from `bytes`.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let mut reader = Reader {
        buf: bytes,
        total: bytes.len(),
    };
    let value = reader.read(0)?;
    match reader.buf.remaining() {
        0 => Ok(value),
        count => Err(CodecError::TrailingBytes { count }),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    fn need(&self, n: usize) -> CodecResult<()> {
        if self.buf.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> CodecResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> CodecResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    fn u32(&mut self) -> CodecResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn u64(&mut self) -> CodecResult<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, len: usize) -> CodecResult<Value> {
        let offset = self.offset();
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8 { offset })?;
        Ok(Value::String(s.to_string()))
    }

    fn array(&mut self, len: usize, depth: usize) -> CodecResult<Value> {
        let mut items = Vec::with_capacity(len.min(self.buf.remaining()));
        for _ in 0..len {
            items.push(self.read(depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    fn map(&mut self, len: usize, depth: usize) -> CodecResult<Value> {
        let mut entries = Vec::with_capacity(len.min(self.buf.remaining() / 2));
        for _ in 0..len {
            let k = self.read(depth + 1)?;
            let v = self.read(depth + 1)?;
            entries.push((k, v));
        }
        Ok(Value::Map(entries))
    }

    fn read(&mut self, depth: usize) -> CodecResult<Value> {
        if depth >= MAX_DEPTH {
            return Err(CodecError::DepthLimitExceeded { max: MAX_DEPTH });
        }
        let offset = self.offset();
        let m = self.u8()?;
        let value = match m {
            0x00..=0x7f => Value::UInt(m as u64),
            0x80..=0x8f => self.map((m & 0x0f) as usize, depth)?,
            0x90..=0x9f => self.array((m & 0x0f) as usize, depth)?,
            0xa0..=0xbf => self.string((m & 0x1f) as usize)?,
            marker::NEGATIVE_FIXINT..=0xff => Value::Int(m as i8 as i64),
            marker::NIL => Value::Nil,
            marker::FALSE => Value::Bool(false),
            marker::TRUE => Value::Bool(true),
            marker::BIN8 => {
                let len = self.u8()? as usize;
                Value::Binary(self.take(len)?.to_vec())
            }
            marker::BIN16 => {
                let len = self.u16()? as usize;
                Value::Binary(self.take(len)?.to_vec())
            }
            marker::BIN32 => {
                let len = self.u32()? as usize;
                Value::Binary(self.take(len)?.to_vec())
            }
            marker::FLOAT32 => Value::Float(f32::from_bits(self.u32()?)),
            marker::FLOAT64 => Value::Double(f64::from_bits(self.u64()?)),
            marker::UINT8 => Value::UInt(self.u8()? as u64),
            marker::UINT16 => Value::UInt(self.u16()? as u64),
            marker::UINT32 => Value::UInt(self.u32()? as u64),
            marker::UINT64 => Value::UInt(self.u64()?),
            marker::INT8 => Value::Int(self.u8()? as i8 as i64),
            marker::INT16 => Value::Int(self.u16()? as i16 as i64),
            marker::INT32 => Value::Int(self.u32()? as i32 as i64),
            marker::INT64 => Value::Int(self.u64()? as i64),
            marker::STR8 => {
                let len = self.u8()? as usize;
                self.string(len)?
            }
            marker::STR16 => {
                let len = self.u16()? as usize;
                self.string(len)?
            }
            marker::STR32 => {
                let len = self.u32()? as usize;
                self.string(len)?
            }
            marker::ARRAY16 => {
                let len = self.u16()? as usize;
                self.array(len, depth)?
            }
            marker::ARRAY32 => {
                let len = self.u32()? as usize;
                self.array(len, depth)?
            }
            marker::MAP16 => {
                let len = self.u16()? as usize;
                self.map(len, depth)?
            }
            marker::MAP32 => {
                let len = self.u32()? as usize;
                self.map(len, depth)?
            }
            other => {
                return Err(CodecError::InvalidMarker {
                    marker: other,
                    offset,
                })
            }
        };
        Ok(value)
    }
}
