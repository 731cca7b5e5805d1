//! FSSTAT (procedure 18) result types as defined in RFC 1813 section 3.3.18.

// Type names follow the RFC
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use crate::protocol::xdr::{deserialize, Deserialize, Serialize};
use crate::{DeserializeStruct, SerializeStruct};

use super::{nfsstat3, post_op_attr, size3};

/// Volatile file system state returned by a successful FSSTAT
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FSSTAT3resok {
    /// Attributes of the object named by the request handle
    pub obj_attributes: post_op_attr,
    /// Total size of file system in bytes
    pub tbytes: size3,
    /// Free space in bytes
    pub fbytes: size3,
    /// Free space available to the user in bytes (considering quotas)
    pub abytes: size3,
    /// Total number of file slots
    pub tfiles: size3,
    /// Number of free file slots
    pub ffiles: size3,
    /// Number of free file slots available to the user
    pub afiles: size3,
    /// Seconds for which the figures above are not expected to change.
    /// Zero marks a volatile file system whose figures must not be cached.
    pub invarsec: u32,
}
DeserializeStruct!(
    FSSTAT3resok,
    obj_attributes,
    tbytes,
    fbytes,
    abytes,
    tfiles,
    ffiles,
    afiles,
    invarsec
);
SerializeStruct!(
    FSSTAT3resok,
    obj_attributes,
    tbytes,
    fbytes,
    abytes,
    tfiles,
    ffiles,
    afiles,
    invarsec
);

/// Body of a failed FSSTAT
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FSSTAT3resfail {
    pub obj_attributes: post_op_attr,
}
DeserializeStruct!(FSSTAT3resfail, obj_attributes);
SerializeStruct!(FSSTAT3resfail, obj_attributes);

/// `union FSSTAT3res switch (nfsstat3 status)`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FSSTAT3res {
    resok(FSSTAT3resok),
    resfail(nfsstat3, FSSTAT3resfail),
}

impl FSSTAT3res {
    /// A failure carrying no attributes (`attributes_follow = FALSE`).
    pub fn failed(stat: nfsstat3) -> Self {
        FSSTAT3res::resfail(stat, FSSTAT3resfail::default())
    }

    pub fn status(&self) -> nfsstat3 {
        match self {
            FSSTAT3res::resok(_) => nfsstat3::NFS3_OK,
            FSSTAT3res::resfail(stat, _) => *stat,
        }
    }
}

impl Default for FSSTAT3res {
    fn default() -> Self {
        FSSTAT3res::failed(nfsstat3::NFS3ERR_SERVERFAULT)
    }
}

impl Serialize for FSSTAT3res {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.status().serialize(dest)?;
        match self {
            FSSTAT3res::resok(ok) => ok.serialize(dest),
            FSSTAT3res::resfail(_, fail) => fail.serialize(dest),
        }
    }
}

impl Deserialize for FSSTAT3res {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<nfsstat3>(src)? {
            nfsstat3::NFS3_OK => FSSTAT3res::resok(deserialize(src)?),
            stat => FSSTAT3res::resfail(stat, deserialize(src)?),
        };
        Ok(())
    }
}
