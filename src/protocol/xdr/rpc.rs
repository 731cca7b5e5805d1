//! ONC RPC version 2 message envelope (RFC 5531), reduced to what a server
//! needs to read calls and write accepted or rejected replies.

// Reply-side constructors and call-side types are not all used by the server
#![allow(dead_code)]
// Type names follow the RFC
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use crate::{DeserializeEnum, DeserializeStruct, SerializeEnum, SerializeStruct};

use super::{deserialize, deserialize_opaque_max, utils, Deserialize, Serialize};

/// Upper bound on the body of a credential or verifier.
pub const MAX_AUTH_BYTES: usize = 400;
/// Upper bound on the `AUTH_UNIX` machine name.
pub const MAX_MACHINE_NAME: usize = 255;

/// Why the server refused to authenticate a call
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_stat {
    #[default]
    AUTH_BADCRED = 1,
    AUTH_REJECTEDCRED = 2,
    AUTH_BADVERF = 3,
    AUTH_REJECTEDVERF = 4,
    AUTH_TOOWEAK = 5,
}
SerializeEnum!(auth_stat);
DeserializeEnum!(auth_stat);

/// Authentication flavor (mechanism) identifiers
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum auth_flavor {
    AUTH_NULL = 0,
    AUTH_UNIX = 1,
    AUTH_SHORT = 2,
    AUTH_DES = 3,
}
SerializeEnum!(auth_flavor);
DeserializeEnum!(auth_flavor);

/// UNIX-style credentials (`AUTH_UNIX` body)
#[derive(Clone, Debug, Default)]
pub struct auth_unix {
    pub stamp: u32,
    pub machinename: Vec<u8>,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}
SerializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);

impl Deserialize for auth_unix {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.stamp.deserialize(src)?;
        deserialize_opaque_max(&mut self.machinename, MAX_MACHINE_NAME, src)?;
        self.uid.deserialize(src)?;
        self.gid.deserialize(src)?;
        self.gids.deserialize(src)
    }
}

/// Credentials or verifier: a flavor and its opaque body
#[derive(Clone, Debug)]
pub struct opaque_auth {
    pub flavor: auth_flavor,
    pub body: Vec<u8>,
}
SerializeStruct!(opaque_auth, flavor, body);

impl Deserialize for opaque_auth {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.flavor.deserialize(src)?;
        deserialize_opaque_max(&mut self.body, MAX_AUTH_BYTES, src)
    }
}

impl Default for opaque_auth {
    fn default() -> opaque_auth {
        opaque_auth { flavor: auth_flavor::AUTH_NULL, body: Vec::new() }
    }
}

/// An RPC message: transaction id followed by a call or a reply.
/// The xid only matches replies to calls; it is not a sequence number.
#[derive(Clone, Debug, Default)]
pub struct rpc_msg {
    pub xid: u32,
    pub body: rpc_body,
}
DeserializeStruct!(rpc_msg, xid, body);
SerializeStruct!(rpc_msg, xid, body);

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
pub enum rpc_body {
    CALL(call_body),
    REPLY(reply_body),
}

impl Default for rpc_body {
    fn default() -> rpc_body {
        rpc_body::CALL(call_body::default())
    }
}

impl Serialize for rpc_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rpc_body::CALL(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            rpc_body::REPLY(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rpc_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => rpc_body::CALL(deserialize(src)?),
            1 => rpc_body::REPLY(deserialize(src)?),
            msg_type => {
                return Err(utils::invalid_data(&format!(
                    "Invalid message type in rpc_body: {msg_type}"
                )))
            }
        };
        Ok(())
    }
}

/// Header of a call; procedure arguments follow it on the wire
#[derive(Clone, Debug, Default)]
pub struct call_body {
    /// RPC version, must be 2
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: opaque_auth,
    pub verf: opaque_auth,
}
DeserializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);
SerializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);

#[derive(Clone, Debug)]
pub enum reply_body {
    MSG_ACCEPTED(accepted_reply),
    MSG_DENIED(rejected_reply),
}

impl Default for reply_body {
    fn default() -> reply_body {
        reply_body::MSG_ACCEPTED(accepted_reply::default())
    }
}

impl Serialize for reply_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            reply_body::MSG_ACCEPTED(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            reply_body::MSG_DENIED(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for reply_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => reply_body::MSG_ACCEPTED(deserialize(src)?),
            1 => reply_body::MSG_DENIED(deserialize(src)?),
            reply_status => {
                return Err(utils::invalid_data(&format!(
                    "Invalid reply status in reply_body: {reply_status}"
                )))
            }
        };
        Ok(())
    }
}

/// Lowest and highest supported version
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct mismatch_info {
    pub low: u32,
    pub high: u32,
}
DeserializeStruct!(mismatch_info, low, high);
SerializeStruct!(mismatch_info, low, high);

/// A call the server accepted; processing may still have failed
#[derive(Clone, Debug, Default)]
pub struct accepted_reply {
    pub verf: opaque_auth,
    pub reply_data: accept_body,
}
DeserializeStruct!(accepted_reply, verf, reply_data);
SerializeStruct!(accepted_reply, verf, reply_data);

/// `union switch (accept_stat stat)`; on `SUCCESS` the procedure result follows
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum accept_body {
    #[default]
    SUCCESS,
    PROG_UNAVAIL,
    PROG_MISMATCH(mismatch_info),
    PROC_UNAVAIL,
    GARBAGE_ARGS,
}

impl Serialize for accept_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            accept_body::SUCCESS => 0_u32.serialize(dest),
            accept_body::PROG_UNAVAIL => 1_u32.serialize(dest),
            accept_body::PROG_MISMATCH(v) => {
                2_u32.serialize(dest)?;
                v.serialize(dest)
            }
            accept_body::PROC_UNAVAIL => 3_u32.serialize(dest),
            accept_body::GARBAGE_ARGS => 4_u32.serialize(dest),
        }
    }
}

impl Deserialize for accept_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => accept_body::SUCCESS,
            1 => accept_body::PROG_UNAVAIL,
            2 => accept_body::PROG_MISMATCH(deserialize(src)?),
            3 => accept_body::PROC_UNAVAIL,
            4 => accept_body::GARBAGE_ARGS,
            accept_stat => {
                return Err(utils::invalid_data(&format!(
                    "Invalid accept stat in accept_body: {accept_stat}"
                )))
            }
        };
        Ok(())
    }
}

/// A call refused before reaching the program
#[derive(Clone, Debug)]
pub enum rejected_reply {
    RPC_MISMATCH(mismatch_info),
    AUTH_ERROR(auth_stat),
}

impl Default for rejected_reply {
    fn default() -> rejected_reply {
        rejected_reply::AUTH_ERROR(auth_stat::default())
    }
}

impl Serialize for rejected_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rejected_reply::RPC_MISMATCH(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            rejected_reply::AUTH_ERROR(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rejected_reply {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<u32>(src)? {
            0 => rejected_reply::RPC_MISMATCH(deserialize(src)?),
            1 => rejected_reply::AUTH_ERROR(deserialize(src)?),
            stat => {
                return Err(utils::invalid_data(&format!(
                    "Invalid reject stat in rejected_reply: {stat}"
                )))
            }
        };
        Ok(())
    }
}

fn accepted(xid: u32, reply_data: accept_body) -> rpc_msg {
    let reply =
        reply_body::MSG_ACCEPTED(accepted_reply { verf: opaque_auth::default(), reply_data });
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}

/// Creates an accepted reply header; the procedure result is written after it
pub fn make_success_reply(xid: u32) -> rpc_msg {
    accepted(xid, accept_body::SUCCESS)
}

/// Creates a reply message indicating that the requested procedure is not available
pub fn proc_unavail_reply_message(xid: u32) -> rpc_msg {
    accepted(xid, accept_body::PROC_UNAVAIL)
}

/// Creates a reply message indicating a program version mismatch
pub fn prog_mismatch_reply_message(xid: u32, low: u32, high: u32) -> rpc_msg {
    accepted(xid, accept_body::PROG_MISMATCH(mismatch_info { low, high }))
}

/// Creates a reply message indicating that the arguments could not be decoded
pub fn garbage_args_reply_message(xid: u32) -> rpc_msg {
    accepted(xid, accept_body::GARBAGE_ARGS)
}

/// Creates a reply message indicating that the program is not served here
pub fn prog_unavail_reply_message(xid: u32) -> rpc_msg {
    accepted(xid, accept_body::PROG_UNAVAIL)
}

/// Creates a denied reply for calls of an RPC version other than 2
pub fn rpc_vers_mismatch(xid: u32) -> rpc_msg {
    let reply = reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(mismatch_info {
        low: 2,
        high: 2,
    }));
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}
