use std::fmt;

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;

/// A compressed BLS public key, held as opaque bytes.
///
/// Signature verification is not performed by this crate; the bytes only serve as a stable
/// identity for validators and sync committee members.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_BYTES_LEN]);

impl PublicKeyBytes {
    pub const fn empty() -> Self {
        Self([0; PUBLIC_KEY_BYTES_LEN])
    }

    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_BYTES_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
