//! Segwit address decoding, see
//! [BIP-173](https://github.com/bitcoin/bips/blob/master/bip-0173.mediawiki)
//! and [BIP-350](https://github.com/bitcoin/bips/blob/master/bip-0350.mediawiki).
//!
//! Only version 0 programs of 20 bytes (P2WPKH) are turned into a
//! [`WitnessProgram`]. Other well-formed segwit addresses still parse as an
//! [`Address`], so they are rejected with a precise reason instead of a
//! checksum failure.

use core::{
    fmt::{self, Display},
    str::FromStr,
};

use bech32::{
    Bech32, Bech32m, Fe32, Hrp,
    primitives::{
        decode::{CheckedHrpstring, UncheckedHrpstring},
        segwit::{MAX_STRING_LENGTH, VERSION_0},
    },
};

use crate::error::DecodeError;

/// Length of a P2WPKH witness program, i.e. HASH160 of a public key
pub const P2WPKH_PROGRAM_LEN: usize = 20;

/// Checksum flavour an address was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// BIP-173, used for witness version 0
    Bech32,
    /// BIP-350, used for witness versions 1 to 16
    Bech32m,
}

/// Bitcoin network an address is expected to belong to.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    /// Human-readable part of segwit addresses on this network
    pub const fn hrp(self) -> &'static str {
        match self {
            Self::Bitcoin => "bc",
            Self::Testnet | Self::Signet => "tb",
            Self::Regtest => "bcrt",
        }
    }

    const fn bech32_hrp(self) -> Hrp {
        match self {
            Self::Bitcoin => bech32::hrp::BC,
            Self::Testnet | Self::Signet => bech32::hrp::TB,
            Self::Regtest => bech32::hrp::BCRT,
        }
    }
}

/// 20-byte P2WPKH witness program, i.e. HASH160 of a compressed public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct WitnessProgram(pub [u8; P2WPKH_PROGRAM_LEN]);

impl WitnessProgram {
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; P2WPKH_PROGRAM_LEN] {
        &self.0
    }

    /// Encodes the program as a P2WPKH address on the given network
    pub fn to_address(&self, network: Network) -> String {
        P2wpkhAddress {
            hrp: network.bech32_hrp(),
            program: self,
        }
        .to_string()
    }
}

struct P2wpkhAddress<'a> {
    hrp: Hrp,
    program: &'a WitnessProgram,
}

impl Display for P2wpkhAddress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bech32::segwit::encode_lower_to_fmt_unchecked(f, self.hrp, VERSION_0, &self.program.0)
    }
}

impl AsRef<[u8]> for WitnessProgram {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for WitnessProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for WitnessProgram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Checksum-verified segwit address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Lower-cased address, checksum included
    encoded: String,
    /// Lower-cased human-readable part
    hrp: String,
    /// 5-bit groups with the witness version first, checksum stripped
    data: Vec<Fe32>,
    variant: Variant,
}

impl Address {
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        if s.len() > MAX_STRING_LENGTH {
            return Err(DecodeError::InvalidLength);
        }
        if !s.contains('1') {
            return Err(DecodeError::MissingSeparator);
        }

        let unchecked = UncheckedHrpstring::new(s)?;
        let (checked, variant) = if unchecked.has_valid_checksum::<Bech32>() {
            (unchecked.remove_checksum::<Bech32>(), Variant::Bech32)
        } else if unchecked.has_valid_checksum::<Bech32m>() {
            (unchecked.remove_checksum::<Bech32m>(), Variant::Bech32m)
        } else {
            return Err(unchecked
                .validate_checksum::<Bech32>()
                .err()
                .map_or(DecodeError::InvalidChecksum, Into::into));
        };

        let data = checked
            .data_part_ascii_no_checksum()
            .iter()
            .map(|&b| {
                let c = char::from(b);
                Fe32::from_char(c).map_err(|_| DecodeError::InvalidCharacter(c))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            encoded: s.to_ascii_lowercase(),
            hrp: checked.hrp().to_lowercase(),
            data,
            variant,
        })
    }

    #[inline]
    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    #[inline]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// 5-bit groups, witness version included
    #[inline]
    pub fn data(&self) -> &[Fe32] {
        &self.data
    }

    pub fn witness_version(&self) -> Result<u8, DecodeError> {
        self.data
            .first()
            .copied()
            .map(Fe32::to_u8)
            .ok_or(DecodeError::InvalidLength)
    }

    /// Extracts the P2WPKH witness program, rejecting every other kind of
    /// segwit output.
    pub fn witness_program(&self) -> Result<WitnessProgram, DecodeError> {
        let version = self.witness_version()?;
        if version != VERSION_0.to_u8() {
            return Err(DecodeError::UnsupportedWitnessVersion(version));
        }
        if self.variant != Variant::Bech32 {
            // version 0 must use the original bech32 constant
            return Err(DecodeError::InvalidChecksum);
        }

        let mut checked = CheckedHrpstring::new::<Bech32>(&self.encoded)?;
        checked.remove_witness_version();
        checked
            .validate_segwit_padding()
            .map_err(|_| DecodeError::InvalidPadding)?;

        let program: Vec<u8> = checked.byte_iter().collect();
        program
            .as_slice()
            .try_into()
            .map(WitnessProgram)
            .map_err(|_| DecodeError::WrongProgramLength(program.len()))
    }

    /// Checks the address belongs to `network`
    pub fn require_network(self, network: Network) -> Result<Self, DecodeError> {
        if self.hrp != network.hrp() {
            return Err(DecodeError::WrongHumanReadablePart {
                expected: network.hrp(),
                found: self.hrp,
            });
        }
        Ok(self)
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Decodes a mainnet P2WPKH address into its witness program
#[inline]
pub fn decode(address: &str) -> Result<WitnessProgram, DecodeError> {
    decode_for(address, Network::Bitcoin)
}

/// Decodes a P2WPKH address of `network` into its witness program
pub fn decode_for(address: &str, network: Network) -> Result<WitnessProgram, DecodeError> {
    Address::parse(address)?
        .require_network(network)?
        .witness_program()
}
