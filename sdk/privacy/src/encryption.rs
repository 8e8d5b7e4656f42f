//! Note Encryption
//!
//! Encrypts note plaintexts for the recipient using ECDH + ChaCha20-Poly1305.
//!
//! ```text
//! Flow:
//! 1. Sender samples ephemeral keypair (esk, epk)
//! 2. Shared secret = ECDH(esk, pk_d)
//! 3. Encryption key = KDF(shared_secret, epk)
//! 4. enc_ciphertext = ChaCha20-Poly1305(key, plaintext)
//! 5. out_ciphertext = AEAD under ock carrying (pk_d, esk), so the
//!    sender's outgoing viewing key can recover the output later
//! ```
//!
//! Keys are single-use (fresh esk per output), so a fixed zero nonce is
//! sound and keeps the ciphertext at its fixed width.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::keys::OutgoingViewingKey;
use crate::note::NotePlaintext;

const KDF_CONTEXT: &str = "sable-privacy note kdf v1";
const OCK_CONTEXT: &str = "sable-privacy ock v1";

/// Note plaintext size: lead byte, diversifier, value, rcm, memo.
pub const NOTE_PLAINTEXT_SIZE: usize = NotePlaintext::SIZE;

/// Encrypted note size: plaintext plus the 16-byte Poly1305 tag.
pub const ENC_CIPHERTEXT_SIZE: usize = NOTE_PLAINTEXT_SIZE + 16;

/// Outgoing ciphertext size: pk_d, esk, tag.
pub const OUT_CIPHERTEXT_SIZE: usize = 32 + 32 + 16;

/// An encrypted note as published on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCiphertext {
    /// Ephemeral public key for ECDH.
    pub epk: [u8; 32],
    /// Encrypted note plaintext with authentication tag.
    pub enc_ciphertext: Vec<u8>,
}

/// Encrypt a note plaintext to a diversified transmission key.
///
/// The caller supplies the ephemeral secret so it can also be sealed
/// into the outgoing ciphertext.
pub fn encrypt_note(plaintext: &NotePlaintext, pk_d: &[u8; 32], esk: &[u8; 32]) -> NoteCiphertext {
    let secret = StaticSecret::from(*esk);
    let epk = PublicKey::from(&secret);
    let shared = secret.diffie_hellman(&PublicKey::from(*pk_d));
    let key = derive_note_key(shared.as_bytes(), epk.as_bytes());

    let cipher = ChaCha20Poly1305::new_from_slice(&key).expect("valid key length");
    let enc_ciphertext = cipher
        .encrypt(&zero_nonce(), plaintext.encode().as_slice())
        .expect("encryption should not fail");

    NoteCiphertext {
        epk: epk.to_bytes(),
        enc_ciphertext,
    }
}

/// Decrypt a note with the recipient's incoming viewing key.
pub fn decrypt_note(ivk: &[u8; 32], ciphertext: &NoteCiphertext) -> Option<NotePlaintext> {
    let secret = StaticSecret::from(*ivk);
    let shared = secret.diffie_hellman(&PublicKey::from(ciphertext.epk));
    let key = derive_note_key(shared.as_bytes(), &ciphertext.epk);
    open_note(&key, ciphertext)
}

/// Decrypt a note from the sender side, with the ephemeral secret
/// recovered out of the outgoing ciphertext.
pub fn decrypt_note_with_esk(
    esk: &[u8; 32],
    pk_d: &[u8; 32],
    ciphertext: &NoteCiphertext,
) -> Option<NotePlaintext> {
    let secret = StaticSecret::from(*esk);
    if PublicKey::from(&secret).to_bytes() != ciphertext.epk {
        return None;
    }
    let shared = secret.diffie_hellman(&PublicKey::from(*pk_d));
    let key = derive_note_key(shared.as_bytes(), &ciphertext.epk);
    open_note(&key, ciphertext)
}

/// Seal (pk_d, esk) under the sender's outgoing viewing key.
///
/// The key is bound to the value commitment, the note commitment and
/// the ephemeral key, so a ciphertext cannot be replayed onto another
/// output.
pub fn encrypt_outgoing(
    ovk: &OutgoingViewingKey,
    cv: &[u8; 32],
    cmu: &[u8; 32],
    epk: &[u8; 32],
    pk_d: &[u8; 32],
    esk: &[u8; 32],
) -> Vec<u8> {
    let ock = derive_ock(ovk, cv, cmu, epk);
    let cipher = ChaCha20Poly1305::new_from_slice(&ock).expect("valid key length");

    let mut plaintext = [0u8; 64];
    plaintext[..32].copy_from_slice(pk_d);
    plaintext[32..].copy_from_slice(esk);

    cipher
        .encrypt(&zero_nonce(), plaintext.as_slice())
        .expect("encryption should not fail")
}

/// Recover (pk_d, esk) from an outgoing ciphertext.
pub fn decrypt_outgoing(
    ovk: &OutgoingViewingKey,
    cv: &[u8; 32],
    cmu: &[u8; 32],
    epk: &[u8; 32],
    out_ciphertext: &[u8],
) -> Option<([u8; 32], [u8; 32])> {
    if out_ciphertext.len() != OUT_CIPHERTEXT_SIZE {
        return None;
    }
    let ock = derive_ock(ovk, cv, cmu, epk);
    let cipher = ChaCha20Poly1305::new_from_slice(&ock).ok()?;
    let plaintext = cipher.decrypt(&zero_nonce(), out_ciphertext).ok()?;

    let mut pk_d = [0u8; 32];
    pk_d.copy_from_slice(&plaintext[..32]);
    let mut esk = [0u8; 32];
    esk.copy_from_slice(&plaintext[32..]);
    Some((pk_d, esk))
}

fn open_note(key: &[u8; 32], ciphertext: &NoteCiphertext) -> Option<NotePlaintext> {
    if ciphertext.enc_ciphertext.len() != ENC_CIPHERTEXT_SIZE {
        return None;
    }
    let cipher = ChaCha20Poly1305::new_from_slice(key).ok()?;
    let plaintext = cipher
        .decrypt(&zero_nonce(), ciphertext.enc_ciphertext.as_slice())
        .ok()?;
    NotePlaintext::decode(&plaintext)
}

fn derive_note_key(shared_secret: &[u8], epk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
    hasher.update(shared_secret);
    hasher.update(epk);
    *hasher.finalize().as_bytes()
}

fn derive_ock(ovk: &OutgoingViewingKey, cv: &[u8; 32], cmu: &[u8; 32], epk: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(OCK_CONTEXT);
    hasher.update(ovk.as_bytes());
    hasher.update(cv);
    hasher.update(cmu);
    hasher.update(epk);
    *hasher.finalize().as_bytes()
}

fn zero_nonce() -> Nonce {
    Nonce::default()
}
