use crate::{
    address::{Network, WitnessProgram, decode_for},
    error::{Error, InputShapeError},
    hashing::signed_message_hash,
    public_key::CompressedPublicKey,
    recovery::RecoverableSignature,
};

/// Outcome of a verification that made it through every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VerificationResult {
    pub valid: bool,
    /// Only set when the key hashes to the address
    pub recovered_pubkey: Option<CompressedPublicKey>,
}

impl VerificationResult {
    #[inline]
    pub const fn valid(public_key: CompressedPublicKey) -> Self {
        Self {
            valid: true,
            recovered_pubkey: Some(public_key),
        }
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self {
            valid: false,
            recovered_pubkey: None,
        }
    }
}

/// Whether `public_key` is the one committed to by `program`
#[inline]
pub fn matches(public_key: &CompressedPublicKey, program: &WitnessProgram) -> bool {
    public_key.witness_program() == *program
}

/// Verifies a legacy signed message against a mainnet P2WPKH address.
///
/// See [`verify_for`].
#[inline]
pub fn verify(
    address: &str,
    message: impl AsRef<[u8]>,
    signature: &[u8],
) -> Result<VerificationResult, Error> {
    verify_for(Network::Bitcoin, address, message, signature)
}

/// Verifies a legacy signed message against a P2WPKH address of `network`.
///
/// Stops at the first failing stage. A key that recovers fine but hashes to
/// a different program is not an error: it yields `valid == false`.
pub fn verify_for(
    network: Network,
    address: &str,
    message: impl AsRef<[u8]>,
    signature: &[u8],
) -> Result<VerificationResult, Error> {
    if address.is_empty() {
        return Err(InputShapeError::EmptyAddress.into());
    }
    let program = decode_for(address, network)?;
    tracing::debug!(%network, %program, "address decoded");

    let message = message.as_ref();
    let digest = signed_message_hash(message);
    tracing::debug!(
        message_len = message.len(),
        digest = %hex::encode(digest),
        "message digested"
    );

    let signature = RecoverableSignature::from_slice(signature)?;
    let public_key = signature.recover(&digest)?;
    tracing::debug!(
        flag = signature.flag().to_byte(),
        %public_key,
        "public key recovered"
    );

    let result = if matches(&public_key, &program) {
        VerificationResult::valid(public_key)
    } else {
        VerificationResult::invalid()
    };
    tracing::debug!(valid = result.valid, "address matched");
    Ok(result)
}
