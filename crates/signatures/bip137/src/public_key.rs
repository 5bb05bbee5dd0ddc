use core::fmt::{self, Debug, Display};

use crate::{address::WitnessProgram, hashing::hash160, secp256k1::COMPRESSED_LEN};

/// SEC1 compressed public key: `0x02`/`0x03` parity tag followed by the
/// big-endian `x` coordinate
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CompressedPublicKey(pub [u8; COMPRESSED_LEN]);

impl CompressedPublicKey {
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; COMPRESSED_LEN] {
        &self.0
    }

    /// HASH160 of the key, i.e. its P2WPKH witness program
    #[inline]
    pub fn witness_program(&self) -> WitnessProgram {
        WitnessProgram(hash160(self.0))
    }
}

impl AsRef<[u8]> for CompressedPublicKey {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CompressedPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
