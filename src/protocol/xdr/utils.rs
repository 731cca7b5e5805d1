//! Padding and error helpers shared by the XDR codecs.

use std::io::{ErrorKind, Read, Write};

/// Every XDR item occupies a multiple of four bytes.
pub const ALIGNMENT: usize = 4;

fn padding_len(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Skips the zero bytes that follow `len` bytes of opaque data.
pub fn read_padding(len: usize, src: &mut impl Read) -> std::io::Result<()> {
    let mut pad = [0_u8; ALIGNMENT];
    src.read_exact(&mut pad[..padding_len(len)])
}

pub fn write_padding(len: usize, dest: &mut impl Write) -> std::io::Result<()> {
    let pad = [0_u8; ALIGNMENT];
    dest.write_all(&pad[..padding_len(len)])
}

/// Reads `len` bytes of opaque data and their padding into `dest`.
///
/// `dest` grows with the bytes actually received, so a length word larger
/// than the remaining input fails without allocating the claimed size.
pub fn read_opaque(len: usize, dest: &mut Vec<u8>, src: &mut impl Read) -> std::io::Result<()> {
    dest.clear();
    let read = src.by_ref().take(len as u64).read_to_end(dest)?;
    if read != len {
        return Err(ErrorKind::UnexpectedEof.into());
    }
    read_padding(len, src)
}

pub fn invalid_data(message: &str) -> std::io::Error {
    std::io::Error::new(ErrorKind::InvalidData, message)
}
