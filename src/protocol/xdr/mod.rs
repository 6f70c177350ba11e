//! XDR (External Data Representation, RFC 4506) encoding used for every
//! request and reply field on the wire.
//!
//! <https://datatracker.ietf.org/doc/html/rfc4506>
//!
//! All integers are fixed-width big-endian. Variable-length opaque data and
//! strings carry a 4-byte length prefix and are zero-padded to a 4-byte
//! boundary. Structures are the concatenation of their fields in declared
//! order; optional data is preceded by an explicit boolean discriminant.
//!
//! Where appropriate, the standard XDR types are replaced by the matching
//! Rust types: `int` is `i32`, `unsigned hyper` is `u64`, `opaque<>` is
//! `Vec<u8>` / `[u8]`, `opaque[n]` is `[u8; N]` and `type *name` is
//! `Option<type>`.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod mount;
pub mod nfs3;
pub mod rpc;
mod utils;

pub use utils::{invalid_data, padding_len, ALIGNMENT};

/// XDR assumes big endian encoding.
pub type XDREndian = BigEndian;

pub trait Serialize {
    /// Serializes the implementing type to the provided writer.
    ///
    /// ## Parameters
    /// * `dest` - Where will the value be serialized to.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if serialization fails.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Deserializes data from the provided reader into the implementing type.
    ///
    /// ## Parameters
    /// * `src` - From where the value will be deserialized.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if deserialization fails.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Deserialization based on the [Default] trait of the type T.
///
/// # Parameters
/// * src - From where the value will be deserialized
///
/// # Returns
/// * `std::io::Result<T>` - the decoded value, or an error if deserialization fails.
pub fn deserialize<T>(src: &mut impl Read) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Marker trait for XDR `enum` type serialization.
pub trait SerializeEnum: ToPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if let Some(val) = self.to_i32() {
            return dest.write_i32::<XDREndian>(val);
        }
        Err(invalid_data("Invalid enum value"))
    }
}

/// Marker trait for XDR `enum` type deserialization.
pub trait DeserializeEnum: FromPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let val = src.read_i32::<XDREndian>()?;
        if let Some(val) = FromPrimitive::from_i32(val) {
            *self = val;
            return Ok(());
        }

        Err(invalid_data("Invalid enum value"))
    }
}

/// XDR `bool` is `enum { FALSE = 0, TRUE = 1 }`, so it travels as an `i32`.
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(if *self { 1 } else { 0 })
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match src.read_i32::<XDREndian>()? {
            0 => *self = false,
            1 => *self = true,
            _ => return Err(invalid_data("Invalid value for bool enum")),
        }
        Ok(())
    }
}

/// XDR `int` type serialization implementation.
impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(*self)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i32::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `hyper` type serialization implementation.
impl Serialize for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i64::<XDREndian>(*self)
    }
}

impl Deserialize for i64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i64::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `unsigned int` type serialization implementation.
impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `unsigned hyper` type serialization implementation.
impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }
}

impl Deserialize for u64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u64::<XDREndian>()?;
        Ok(())
    }
}

/// XDR Fixed-Length Opaque Data.
///
/// ```text
/// opaque identifier[n];
/// ```
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)?;
        utils::write_padding(N, dest)
    }
}

impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)?;
        utils::read_padding(N, src)
    }
}

/// Object lengths in XDR are always serialized as [u32]. This wrapper
/// type provides a way to serialize the [usize] type common to Rust as [u32].
#[derive(Default)]
struct UsizeAsU32(usize);

impl Serialize for UsizeAsU32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Some(val) = self.0.to_u32() else {
            return Err(invalid_data("cannot cast `usize` to `u32`"));
        };

        val.serialize(dest)
    }
}

impl Deserialize for UsizeAsU32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let Some(val) = deserialize::<u32>(src)?.to_usize() else {
            return Err(invalid_data("cannot cast `u32` to `usize`"));
        };

        self.0 = val;
        Ok(())
    }
}

/// XDR Variable-Length Opaque Data serialization implementation.
impl Serialize for [u8] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsU32(self.len()).serialize(dest)?;
        dest.write_all(self)?;
        utils::write_padding(self.len(), dest)
    }
}

impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

/// XDR Variable-Length Opaque Data deserialization implementation.
///
/// The length prefix is untrusted, so the buffer grows only as bytes
/// actually arrive instead of being preallocated from the prefix.
impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<UsizeAsU32>(src)?.0;
        self.clear();

        let read = (&mut *src).take(length as u64).read_to_end(self)?;
        if read != length {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated opaque data",
            ));
        }
        utils::read_padding(length, src)
    }
}

/// XDR String serialization implementation.
impl Serialize for str {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_bytes().serialize(dest)
    }
}

impl Serialize for String {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_str().serialize(dest)
    }
}

/// XDR String deserialization implementation. Non UTF-8 input is rejected.
impl Deserialize for String {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let bytes = deserialize::<Vec<u8>>(src)?;
        *self = String::from_utf8(bytes).map_err(|_| invalid_data("Not UTF-8 string"))?;
        Ok(())
    }
}

/// XDR Fixed-Length Array of non-opaque elements.
impl<const N: usize, T: Serialize> Serialize for [T; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        for i in self {
            i.serialize(dest)?;
        }

        Ok(())
    }
}

impl<const N: usize, T: Deserialize> Deserialize for [T; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        for i in self {
            i.deserialize(src)?;
        }

        Ok(())
    }
}

/// XDR Variable-Length Array: a 4-byte count followed by that many elements.
impl<T: Serialize> Serialize for [T] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsU32(self.len()).serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }

        Ok(())
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

impl<T: Deserialize + Default> Deserialize for Vec<T> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<UsizeAsU32>(src)?.0;
        self.clear();
        for _ in 0..length {
            self.push(deserialize::<T>(src)?);
        }
        Ok(())
    }
}

/// XDR Optional-Data serialization implementation.
///
/// ```text
/// type *identifier;
/// ```
impl<T: Serialize> Serialize for Option<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            Some(data) => {
                true.serialize(dest)?;
                data.serialize(dest)
            }
            None => false.serialize(dest),
        }
    }
}

impl<T: Deserialize + Default> Deserialize for Option<T> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        if deserialize::<bool>(src)? {
            *self = Some(deserialize::<T>(src)?);
        } else {
            *self = None;
        }

        Ok(())
    }
}

/// Implements XDR serialization for a struct by serializing each listed
/// field in declared order.
#[macro_export]
macro_rules! SerializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::protocol::xdr::Serialize::serialize(&self.$element, dest)?;)*
                Ok(())
            }
        }
    };
}

/// Implements XDR deserialization for a struct by deserializing each listed
/// field in declared order.
#[macro_export]
macro_rules! DeserializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $($crate::protocol::xdr::Deserialize::deserialize(&mut self.$element, src)?;)*
                Ok(())
            }
        }
    };
}

pub use crate::DeserializeStruct;
pub use crate::SerializeStruct;
