use crc::Crc;
use std::fmt::Debug;
use thiserror::Error;

/// Number of trailing signature bytes on every outbound frame.
pub const SIGNATURE_LEN: usize = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame length {0}: a signed frame needs at least 2 bytes")]
    InvalidFrameLength(usize),
}

#[derive(Clone, Eq, PartialEq)]
/// A raw frame as it travels over the command channel, signature included.
pub struct Frame {
    pub(crate) bytes: Vec<u8>,
}

impl Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hexdump(&self.bytes))
    }
}

impl Frame {
    pub fn from_slice(bytes: &[u8]) -> Self {
        Frame {
            bytes: bytes.into(),
        }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Frame { bytes }
    }

    /// Copies a template and signs the copy, leaving the template untouched.
    pub fn signed(template: &[u8]) -> Result<Self, FrameError> {
        let mut bytes = template.to_vec();
        sign(&mut bytes)?;
        Ok(Frame { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn stringify(&self) -> String {
        stringify(&self.bytes)
    }

    /// True if the trailing two bytes match the signature of the rest of the frame.
    pub fn has_valid_signature(&self) -> bool {
        match self.bytes.len().checked_sub(SIGNATURE_LEN) {
            Some(split) => self.bytes[split..] == checksum(&self.bytes[..split]),
            None => false,
        }
    }
}

pub const CRC_ALGO: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_SPI_FUJITSU);

/// Computes the frame signature. The byte-wise rotate/xor/shift signing routine the machine
/// validates is the table-free form of `CRC_16_SPI_FUJITSU` (initial 0x1d0f, poly 0x1021),
/// and the signature is stored most-significant byte first.
pub fn checksum(buffer: &[u8]) -> [u8; 2] {
    CRC_ALGO.checksum(buffer).to_be_bytes()
}

/// Signs a frame in place: the signature covers every byte but the last two, which are
/// always overwritten.
pub fn sign(frame: &mut [u8]) -> Result<(), FrameError> {
    let split = frame
        .len()
        .checked_sub(SIGNATURE_LEN)
        .ok_or(FrameError::InvalidFrameLength(frame.len()))?;
    let signature = checksum(&frame[..split]);
    frame[split..].copy_from_slice(&signature);
    Ok(())
}

pub fn stringify(buffer: &[u8]) -> String {
    buffer
        .iter()
        .map(|n| format!("{:02x}", n))
        .collect::<String>()
}

/// Dumps a frame to a readable hex form.
pub fn hexdump(buffer: &[u8]) -> String {
    let maybe_space = |i| if i > 0 && i % 8 == 0 { " " } else { "" };
    let s1: String = buffer
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}{:02x}", maybe_space(i), b))
        .collect::<String>();
    let s2: String = buffer
        .iter()
        .map(|b| {
            if *b >= 32 && *b < 127 {
                *b as char
            } else {
                '.'
            }
        })
        .collect::<String>();
    format!("|{}| |{}|", s1, s2)
}
