//! Legacy Bitcoin signed message verification for native segwit addresses.
//!
//! Wallets such as UniSat implement "Sign Message" for P2WPKH accounts with
//! the pre-segwit scheme: a 65-byte compact ECDSA signature over
//! [`signed_message_hash`], from which the public key is recovered. The key is
//! then checked against the address by its HASH160.
//!
//! ```text
//! address ──decode──► witness program ─────────────┐
//! message ──digest──► hash ──recover(signature)──► public key ──match──► valid
//! ```
//!
//! Everything runs on public data only: there are no secrets and nothing
//! needs to be constant-time.

pub mod address;
pub mod error;
pub mod hashing;
pub mod public_key;
pub mod recovery;
pub mod secp256k1;
pub mod verification;

pub use self::{
    address::{Address, Network, WitnessProgram, decode, decode_for},
    error::{DecodeError, Error, InputShapeError, RecoveryError, Stage},
    hashing::{CryptoHash, signed_message_hash},
    public_key::CompressedPublicKey,
    recovery::{RecoverableSignature, RecoveryFlag, RecoveryId, SIGNATURE_LEN, recover},
    verification::{VerificationResult, matches, verify, verify_for},
};

/// `(address, message, signature)` triple as exported by wallets
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBip137Payload {
    pub address: String,
    pub message: String,

    /// `flag || r || s`, base64 in JSON
    #[cfg_attr(
        feature = "serde",
        serde(with = "serde_with::As::<serde_with::base64::Base64>")
    )]
    pub signature: [u8; SIGNATURE_LEN],
}

impl SignedBip137Payload {
    #[inline]
    pub fn hash(&self) -> CryptoHash {
        signed_message_hash(&self.message)
    }

    #[inline]
    pub fn verify(&self, network: Network) -> Result<VerificationResult, Error> {
        verify_for(network, &self.address, &self.message, &self.signature)
    }
}
