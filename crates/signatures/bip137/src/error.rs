//! Error types for signed message verification
//!
//! Errors are grouped by the pipeline stage that produced them, so callers
//! can always tell *where* a verification stopped, not only that it did.

use bech32::primitives::{
    decode::{CharError, CheckedHrpstringError, ChecksumError, UncheckedHrpstringError},
    hrp,
};
use thiserror::Error as ThisError;

/// Pipeline stage of a verification call.
///
/// Digesting is total and a mismatching key is reported as
/// [`VerificationResult::invalid`](crate::VerificationResult::invalid), so
/// [`Error::stage`] only ever returns [`Stage::Decode`] or [`Stage::Recover`].
/// The other two name the remaining steps in logs and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum Stage {
    Decode,
    /// Never fails
    Digest,
    Recover,
    /// Never fails, a foreign key is not an error
    Match,
}

/// Malformed or unsupported bech32 address.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DecodeError {
    #[error("mixed-case address")]
    MixedCase,
    #[error("missing separator or empty human-readable part")]
    MissingSeparator,
    #[error("invalid address length")]
    InvalidLength,
    #[error("invalid character: {0:?}")]
    InvalidCharacter(char),
    #[error("invalid checksum")]
    InvalidChecksum,
    #[error("wrong human-readable part: expected `{expected}`, got `{found}`")]
    WrongHumanReadablePart {
        expected: &'static str,
        found: String,
    },
    #[error("unsupported witness version: {0}")]
    UnsupportedWitnessVersion(u8),
    #[error("invalid padding")]
    InvalidPadding,
    #[error("wrong witness program length: {0}")]
    WrongProgramLength(usize),
}

impl From<CharError> for DecodeError {
    fn from(err: CharError) -> Self {
        match err {
            CharError::MixedCase => Self::MixedCase,
            CharError::NothingAfterSeparator => Self::InvalidLength,
            CharError::InvalidChar(c) => Self::InvalidCharacter(c),
            _ => Self::MissingSeparator,
        }
    }
}

impl From<hrp::Error> for DecodeError {
    fn from(err: hrp::Error) -> Self {
        match err {
            hrp::Error::MixedCase => Self::MixedCase,
            hrp::Error::TooLong(_) => Self::InvalidLength,
            hrp::Error::NonAsciiChar(c) => Self::InvalidCharacter(c),
            hrp::Error::InvalidAsciiByte(b) => Self::InvalidCharacter(char::from(b)),
            _ => Self::MissingSeparator,
        }
    }
}

impl From<UncheckedHrpstringError> for DecodeError {
    fn from(err: UncheckedHrpstringError) -> Self {
        match err {
            UncheckedHrpstringError::Char(err) => err.into(),
            UncheckedHrpstringError::Hrp(err) => err.into(),
            _ => Self::MissingSeparator,
        }
    }
}

impl From<ChecksumError> for DecodeError {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::InvalidResidue => Self::InvalidChecksum,
            _ => Self::InvalidLength,
        }
    }
}

impl From<CheckedHrpstringError> for DecodeError {
    fn from(err: CheckedHrpstringError) -> Self {
        match err {
            CheckedHrpstringError::Parse(err) => err.into(),
            CheckedHrpstringError::Checksum(err) => err.into(),
            _ => Self::InvalidChecksum,
        }
    }
}

/// Inputs with the wrong shape, rejected before any decoding or curve math.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum InputShapeError {
    #[error("empty address")]
    EmptyAddress,
    #[error("signature must be 65 bytes, got {0}")]
    SignatureLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum RecoveryError {
    #[error("invalid recovery flag: {0}")]
    InvalidFlag(u8),
    #[error("r or s is out of range")]
    InvalidScalar,
    #[error("no curve point for recovered x-coordinate")]
    NoCurvePoint,
    #[error("recovered point does not satisfy the signature")]
    SignatureMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("address: {0}")]
    Decode(#[from] DecodeError),
    #[error("input: {0}")]
    InputShape(#[from] InputShapeError),
    #[error("recovery: {0}")]
    Recovery(#[from] RecoveryError),
}

impl Error {
    /// Stage of the pipeline this error stopped verification at.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Decode(_) | Self::InputShape(InputShapeError::EmptyAddress) => Stage::Decode,
            Self::InputShape(InputShapeError::SignatureLength(_)) | Self::Recovery(_) => {
                Stage::Recover
            }
        }
    }
}
