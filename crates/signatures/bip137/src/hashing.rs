//! Bitcoin message hashing
//!
//! Wallets never sign a message directly. They sign the double SHA-256 of
//! the message framed by a fixed magic prefix and a compact-size length:
//!
//! ```text
//! SHA256(SHA256(0x18 || "Bitcoin Signed Message:\n" || compact_size(len) || message))
//! ```
//!
//! The hashers here implement the `digest` traits so they compose with the
//! rest of the RustCrypto ecosystem.

use digest::{
    Digest, FixedOutput, HashMarker, Output, OutputSizeUser, Update, consts::U20,
};
use ripemd::Ripemd160;
use sha2::Sha256;

/// Output of SHA-256 based hashers.
pub type CryptoHash = [u8; 32];

/// Magic prefix as serialized on the wire, i.e. with its own length byte.
pub const MESSAGE_MAGIC: &[u8; 25] = b"\x18Bitcoin Signed Message:\n";

/// Hash of the hash: `D(D(data))`.
#[derive(Debug, Clone, Default)]
pub struct Double<D>(D);

impl<D> Update for Double<D>
where
    D: Update,
{
    #[inline]
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
}

impl<D> OutputSizeUser for Double<D>
where
    D: OutputSizeUser,
{
    type OutputSize = D::OutputSize;
}

impl<D> FixedOutput for Double<D>
where
    D: FixedOutput + Update + Default,
{
    #[inline]
    fn finalize_into(self, out: &mut Output<Self>) {
        D::default()
            .chain(self.0.finalize_fixed())
            .finalize_into(out);
    }
}

impl<D> HashMarker for Double<D> where D: HashMarker {}

pub type DoubleSha256 = Double<Sha256>;

/// HASH160 is Bitcoin's standard public key hash: `RIPEMD160(SHA256(data))`.
#[derive(Debug, Clone, Default)]
pub struct Hash160(Sha256);

impl Update for Hash160 {
    #[inline]
    fn update(&mut self, data: &[u8]) {
        Update::update(&mut self.0, data);
    }
}

impl OutputSizeUser for Hash160 {
    type OutputSize = U20;
}

impl FixedOutput for Hash160 {
    #[inline]
    fn finalize_into(self, out: &mut Output<Self>) {
        Digest::finalize_into(Ripemd160::new_with_prefix(self.0.finalize_fixed()), out);
    }
}

impl HashMarker for Hash160 {}

#[inline]
pub fn hash160(data: impl AsRef<[u8]>) -> [u8; 20] {
    Hash160::digest(data).into()
}

/// Bitcoin `CompactSize` (a.k.a. varint) encoding, always in its shortest
/// form.
pub fn encode_compact_size(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    if n < 0xfd {
        buf.push(n.to_le_bytes()[0]);
    } else if let Ok(n) = u16::try_from(n) {
        buf.push(0xfd);
        buf.extend_from_slice(&n.to_le_bytes());
    } else if let Ok(n) = u32::try_from(n) {
        buf.push(0xfe);
        buf.extend_from_slice(&n.to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
    buf
}

/// Digest a wallet signs for `message` with "Sign Message".
pub fn signed_message_hash(message: impl AsRef<[u8]>) -> CryptoHash {
    let message = message.as_ref();
    // `usize` is at most 64 bits wide on every supported target
    let len = u64::try_from(message.len()).unwrap_or(u64::MAX);

    DoubleSha256::new()
        .chain_update(MESSAGE_MAGIC)
        .chain_update(encode_compact_size(len))
        .chain_update(message)
        .finalize()
        .into()
}
