//! [`Encode`] and [`Decode`] for primitives and std containers.

use crate::decoder::{Decode, Decoder};
use crate::encoder::{Encode, Encoder};
use crate::error::CodecResult;
use crate::value::Value;

/// Byte string encoded as MessagePack binary.
///
/// `Vec<u8>` encodes as an array of integers like any other `Vec<T>`; wrap
/// it in `Bytes` to get the compact `bin` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Encode for Bytes {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_bytes(&self.0);
        Ok(())
    }
}

impl Decode for Bytes {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        decoder.single_value_container().decode_bytes().map(Bytes)
    }
}

impl Encode for bool {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_bool(*self);
        Ok(())
    }
}

impl Decode for bool {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        decoder.single_value_container().decode_bool()
    }
}

macro_rules! signed {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
                    encoder.single_value_container().encode_i64(i64::from(*self));
                    Ok(())
                }
            }

            impl Decode for $t {
                fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
                    decoder.single_value_container().decode_int::<$t>()
                }
            }
        )*
    };
}

macro_rules! unsigned {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
                    encoder.single_value_container().encode_u64(u64::from(*self));
                    Ok(())
                }
            }

            impl Decode for $t {
                fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
                    decoder.single_value_container().decode_int::<$t>()
                }
            }
        )*
    };
}

signed!(i8, i16, i32, i64);
unsigned!(u8, u16, u32, u64);

impl Encode for f32 {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_f32(*self);
        Ok(())
    }
}

impl Decode for f32 {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        decoder.single_value_container().decode_f32()
    }
}

impl Encode for f64 {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_f64(*self);
        Ok(())
    }
}

impl Decode for f64 {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        decoder.single_value_container().decode_f64()
    }
}

impl Encode for str {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_str(self);
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        self.as_str().encode(encoder)
    }
}

impl Decode for String {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        decoder.single_value_container().decode_str()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        match self {
            Some(value) => value.encode(encoder),
            None => {
                encoder.single_value_container().encode_nil();
                Ok(())
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        if decoder.single_value_container().decode_nil() {
            return Ok(None);
        }
        T::decode(decoder).map(Some)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        let mut container = encoder.unkeyed_container();
        for item in self {
            container.encode(item)?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        self.as_slice().encode(encoder)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut container = decoder.unkeyed_container()?;
        let mut out = Vec::with_capacity(container.count());
        while !container.is_at_end() {
            out.push(container.decode()?);
        }
        Ok(out)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        (**self).encode(encoder)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        (**self).encode(encoder)
    }
}

impl Encode for Value {
    fn encode(&self, encoder: &mut Encoder) -> CodecResult<()> {
        encoder.single_value_container().encode_value(self.clone());
        Ok(())
    }
}

impl Decode for Value {
    fn decode(decoder: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(decoder.single_value_container().decode_value())
    }
}
