//! Structured binary codec for Arbor.
//!
//! Domain types describe themselves through the [`Encode`] and [`Decode`]
//! traits by requesting one of three container shapes: keyed (a map),
//! unkeyed (an array) or a single value. The encoder assembles the result
//! into an in-memory [`Value`] tree, which [`wire`] then writes as compact
//! MessagePack. Decoding runs the same steps in reverse.
//!
//! A keyed or unkeyed container can [`defer`](KeyedEncodingContainer::defer)
//! a slot: the slot keeps its position in the output while its contents are
//! produced later by a [`ReferencingEncoder`] and spliced in with
//! [`ReferencingEncoder::finish`].
//!
//! ```
//! use arbor_codec::{from_slice, to_vec};
//!
//! let bytes = to_vec(&vec![1u8, 2, 3]).unwrap();
//! assert_eq!(bytes, [0x93, 0x01, 0x02, 0x03]);
//! let back: Vec<u8> = from_slice(&bytes).unwrap();
//! assert_eq!(back, [1, 2, 3]);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
mod impls;
pub mod user_info;
pub mod value;
pub mod wire;

pub use decoder::{
    Decode, Decoder, FixedInt, KeyedDecodingContainer, SingleValueDecodingContainer,
    UnkeyedDecodingContainer,
};
pub use encoder::{
    Encode, Encoder, KeyedEncodingContainer, ReferencingEncoder, SingleValueEncodingContainer,
    UnkeyedEncodingContainer,
};
pub use error::{render_path, CodecError, CodecResult, PathKey};
pub use impls::Bytes;
pub use user_info::UserInfo;
pub use value::Value;

/// Encode a value to MessagePack bytes.
pub fn to_vec<T: Encode + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    to_vec_with(value, &UserInfo::default())
}

/// Encode a value, making `user_info` available to every `encode` call.
pub fn to_vec_with<T: Encode + ?Sized>(value: &T, user_info: &UserInfo) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::with_user_info(user_info.clone());
    value.encode(&mut encoder)?;
    let tree = encoder.into_value()?;
    wire::encode_value(&tree)
}

/// Decode a value from MessagePack bytes.
pub fn from_slice<T: Decode>(bytes: &[u8]) -> CodecResult<T> {
    from_slice_with(bytes, &UserInfo::default())
}

/// Decode a value, making `user_info` available to every `decode` call.
pub fn from_slice_with<T: Decode>(bytes: &[u8], user_info: &UserInfo) -> CodecResult<T> {
    let tree = wire::decode_value(bytes)?;
    let mut decoder = Decoder::new(&tree, user_info);
    T::decode(&mut decoder)
}
