//! Note encryption for the receiver: ephemeral ECDH, a counter-mode BLAKE2s
//! PRF-expand, and ChaCha20-Poly1305.
//!
//! Wire form: `ephemeral_pub (32) ‖ AEAD ciphertext (plaintext + 16-byte tag)`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::error::{Error, Result};
use crate::jubjub::{PublicKey, SigningKey};
use crate::note::SharedNote;

const KDF_KEY: &[u8] = b"Zcash_ExpandSeed";
const AEAD_KEY_LEN: usize = 32;
const AEAD_NONCE_LEN: usize = 12;
const EPHEMERAL_PUB_LEN: usize = 32;

/// PRF-expand: counter-mode keyed BLAKE2s-256 over the shared secret.
///
/// `block_i = BLAKE2s(key = "Zcash_ExpandSeed", data = ss ‖ i)` with the
/// counter starting at 1; the concatenation is truncated to `output_len`.
pub fn kdf(shared_secret: &[u8; 32], output_len: usize) -> Result<Vec<u8>> {
    let blocks = output_len.div_ceil(32);
    if blocks > u8::MAX as usize {
        return Err(Error::CryptoFailure("KDF counter overflow"));
    }
    let mut stream = Vec::with_capacity(blocks * 32);
    for counter in 1..=blocks as u8 {
        let digest = blake2s_simd::Params::new()
            .hash_length(32)
            .key(KDF_KEY)
            .to_state()
            .update(shared_secret)
            .update(&[counter])
            .finalize();
        stream.extend_from_slice(digest.as_bytes());
    }
    stream.truncate(output_len);
    Ok(stream)
}

fn derive_aead(shared_secret: &[u8; 32]) -> Result<(Key, Nonce)> {
    let okm = kdf(shared_secret, AEAD_KEY_LEN + AEAD_NONCE_LEN)?;
    let key = *Key::from_slice(&okm[..AEAD_KEY_LEN]);
    let nonce = *Nonce::from_slice(&okm[AEAD_KEY_LEN..]);
    Ok((key, nonce))
}

/// Encrypt a shared note for `receiver`.
///
/// A fresh ephemeral keypair is generated per call; the ECDH secret between
/// the ephemeral key and the receiver key drives the KDF. If `ad` is given it
/// is authenticated and must match byte-for-byte on decryption.
pub fn encrypt_for<R: RngCore>(
    rng: &mut R,
    receiver: &PublicKey,
    shared: &SharedNote,
    ad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let ephemeral = SigningKey::generate(rng);
    let secret = ephemeral.ecdh(receiver)?;
    let (key, nonce) = derive_aead(&secret)?;

    let cipher = ChaCha20Poly1305::new(&key);
    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: &shared.encode(),
                aad: ad.unwrap_or(&[]),
            },
        )
        .map_err(|_| Error::CryptoFailure("AEAD seal failed"))?;

    let mut wire = Vec::with_capacity(EPHEMERAL_PUB_LEN + ciphertext.len());
    wire.extend_from_slice(&ephemeral.public().to_bytes());
    wire.extend_from_slice(&ciphertext);
    Ok(wire)
}

/// Attempt to decrypt a wire-encoded note with our key.
///
/// Returns `None` on any failure: not every published ciphertext is addressed
/// to this key, so a tag mismatch is expected noise during wallet discovery,
/// not an error.
pub fn try_decrypt(my_key: &SigningKey, wire: &[u8], ad: Option<&[u8]>) -> Option<SharedNote> {
    if wire.len() < EPHEMERAL_PUB_LEN {
        return None;
    }
    let mut eph_bytes = [0u8; EPHEMERAL_PUB_LEN];
    eph_bytes.copy_from_slice(&wire[..EPHEMERAL_PUB_LEN]);
    let ephemeral = PublicKey::from_bytes(&eph_bytes).ok()?;

    let secret = my_key.ecdh(&ephemeral).ok()?;
    let (key, nonce) = derive_aead(&secret).ok()?;

    let cipher = ChaCha20Poly1305::new(&key);
    let plaintext = cipher
        .decrypt(
            &nonce,
            Payload {
                msg: &wire[EPHEMERAL_PUB_LEN..],
                aad: ad.unwrap_or(&[]),
            },
        )
        .ok()?;
    SharedNote::decode(&plaintext).ok()
}
