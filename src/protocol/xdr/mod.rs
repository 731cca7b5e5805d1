//! XDR (External Data Representation, RFC 4506) encoding used by the
//! STATFS/FSSTAT replies and by the RPC envelope around them.
//!
//! XDR types are mapped onto Rust types where a natural counterpart exists:
//! `int` is `i32`, `unsigned hyper` is `u64`, `opaque<>` is `[u8]`/`Vec<u8>`,
//! `opaque[n]` is `[u8; n]`. Boolean-discriminated unions are enums with a
//! `Void` arm.
//! Every item is padded to a multiple of four bytes and written big endian.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod nfs2;
pub mod nfs3;
pub mod rpc;
mod utils;

/// XDR assumes big endian encoding.
pub type XDREndian = BigEndian;

pub trait Serialize {
    /// Writes the XDR representation of `self` into `dest`.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Replaces `self` with a value read from `src`.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Reads a fresh `T` from `src`, starting from `T::default()`.
pub fn deserialize<T>(src: &mut impl Read) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Marker trait for XDR `enum` serialization, see [`SerializeEnum!`](crate::SerializeEnum).
pub trait SerializeEnum: ToPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if let Some(val) = self.to_i32() {
            return dest.write_i32::<XDREndian>(val);
        }
        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// Marker trait for XDR `enum` deserialization, see [`DeserializeEnum!`](crate::DeserializeEnum).
pub trait DeserializeEnum: FromPrimitive {}

impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let val = src.read_i32::<XDREndian>()?;
        if let Some(val) = FromPrimitive::from_i32(val) {
            *self = val;
            return Ok(());
        }

        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// `bool` is `enum { FALSE = 0, TRUE = 1 }`.
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
            _ => return Err(utils::invalid_data("Invalid value for bool enum")),
        }
        Ok(())
    }
}

/// XDR `unsigned int`.
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

/// XDR `unsigned hyper`.
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

/// Fixed-length opaque data, `opaque identifier[n]`.
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

/// Lengths travel as `u32` on the wire.
#[derive(Default)]
struct UsizeAsU32(usize);

impl Serialize for UsizeAsU32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Some(val) = self.0.to_u32() else {
            return Err(utils::invalid_data("cannot cast `usize` to `u32`"));
        };

        val.serialize(dest)
    }
}

impl Deserialize for UsizeAsU32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let Some(val) = deserialize::<u32>(src)?.to_usize() else {
            return Err(utils::invalid_data("cannot cast `u32` to `usize`"));
        };

        self.0 = val;
        Ok(())
    }
}

/// Variable-length opaque data, `opaque identifier<>`.
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

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<UsizeAsU32>(src)?.0;
        utils::read_opaque(length, self, src)
    }
}

/// Reads `opaque identifier<max>` into `dest`.
///
/// The length word is checked against `max` before any data is read.
pub fn deserialize_opaque_max<R: Read>(
    dest: &mut Vec<u8>,
    max: usize,
    src: &mut R,
) -> std::io::Result<()> {
    let length = deserialize::<UsizeAsU32>(src)?.0;
    if length > max {
        return Err(utils::invalid_data("opaque data exceeds its maximum length"));
    }
    utils::read_opaque(length, dest, src)
}

impl Serialize for Vec<u32> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsU32(self.len()).serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }
        Ok(())
    }
}

impl Deserialize for Vec<u32> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<UsizeAsU32>(src)?.0;
        self.clear();
        for _ in 0..length {
            self.push(deserialize::<u32>(src)?);
        }
        Ok(())
    }
}

/// Implements [`Serialize`] for a struct by writing each listed field in order.
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

/// Implements [`Deserialize`] for a struct by reading each listed field in order.
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

/// Marks a `ToPrimitive` enum as an XDR `enum`.
#[macro_export]
macro_rules! SerializeEnum {
    ($t:ident) => {
        impl $crate::protocol::xdr::SerializeEnum for $t {}
    };
}

/// Marks a `FromPrimitive` enum as an XDR `enum`.
#[macro_export]
macro_rules! DeserializeEnum {
    ($t:ident) => {
        impl $crate::protocol::xdr::DeserializeEnum for $t {}
    };
}

/// Writes a `union switch (bool)` whose `FALSE` arm is `Void`.
#[macro_export]
macro_rules! SerializeBoolUnion {
    ($t:ident, $case:ident, $case_type:ty) => {
        impl $crate::protocol::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                match self {
                    $t::Void => $crate::protocol::xdr::Serialize::serialize(&false, dest),
                    $t::$case(v) => {
                        $crate::protocol::xdr::Serialize::serialize(&true, dest)?;
                        $crate::protocol::xdr::Serialize::serialize(v, dest)
                    }
                }
            }
        }
    };
}

/// Reads a `union switch (bool)` whose `FALSE` arm is `Void`.
#[macro_export]
macro_rules! DeserializeBoolUnion {
    ($t:ident, $case:ident, $case_type:ty) => {
        impl $crate::protocol::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                if $crate::protocol::xdr::deserialize::<bool>(src)? {
                    *self = $t::$case($crate::protocol::xdr::deserialize::<$case_type>(src)?);
                } else {
                    *self = $t::Void;
                }
                Ok(())
            }
        }
    };
}
