//! AES-128-CBC payload encryption.
//!
//! Every device ships with the same bootstrap key; the authentication
//! exchange replaces it with a per-session key. The IV never changes.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Block};

use crate::error::{CodecError, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Factory key every device accepts until a session key is negotiated.
pub const INITIAL_KEY: [u8; 16] = [
    0x09, 0x76, 0x28, 0x34, 0x3f, 0xe9, 0x9e, 0x23, 0x76, 0x5c, 0x15, 0x13, 0xac, 0xcf, 0x8b, 0x02,
];

/// Fixed initialization vector used for all traffic.
pub const INITIAL_VECTOR: [u8; 16] = [
    0x56, 0x2e, 0x17, 0x99, 0x6d, 0x09, 0x3d, 0x28, 0xdd, 0xb3, 0xba, 0x69, 0x5a, 0x2e, 0x6f, 0x58,
];

/// Encrypt a cleartext payload, zero-padding it to the next block boundary.
pub fn encrypt(key: &[u8; 16], cleartext: &[u8]) -> Vec<u8> {
    let mut buf = cleartext.to_vec();
    let trailing = buf.len() % BLOCK_SIZE;
    if trailing != 0 {
        buf.resize(buf.len() + BLOCK_SIZE - trailing, 0);
    }

    let mut cipher = Aes128CbcEnc::new(key.into(), (&INITIAL_VECTOR).into());
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block_mut(Block::from_mut_slice(block));
    }
    buf
}

/// Decrypt an encrypted payload. The input must be whole blocks.
pub fn decrypt(key: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CodecError::MisalignedPayload(ciphertext.len()));
    }

    let mut buf = ciphertext.to_vec();
    let mut cipher = Aes128CbcDec::new(key.into(), (&INITIAL_VECTOR).into());
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block_mut(Block::from_mut_slice(block));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_whole_blocks() {
        let payload = [0xabu8; 32];
        let encrypted = encrypt(&INITIAL_KEY, &payload);
        assert_eq!(encrypted.len(), 32);
        assert_ne!(&encrypted[..], &payload[..]);

        let decrypted = decrypt(&INITIAL_KEY, &encrypted).unwrap();
        assert_eq!(&decrypted[..], &payload[..]);
    }

    #[test]
    fn test_round_trip_pads_with_zeros() {
        let payload = [0x11u8, 0x22, 0x33];
        let encrypted = encrypt(&INITIAL_KEY, &payload);
        assert_eq!(encrypted.len(), 16);

        let decrypted = decrypt(&INITIAL_KEY, &encrypted).unwrap();
        assert_eq!(&decrypted[..3], &payload[..]);
        assert!(decrypted[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_payload_encrypts_to_nothing() {
        let encrypted = encrypt(&INITIAL_KEY, &[]);
        assert!(encrypted.is_empty());
        assert!(decrypt(&INITIAL_KEY, &encrypted).unwrap().is_empty());
    }

    #[test]
    fn test_decrypt_rejects_partial_blocks() {
        let result = decrypt(&INITIAL_KEY, &[0u8; 17]);
        assert!(matches!(result, Err(CodecError::MisalignedPayload(17))));
    }

    #[test]
    fn test_different_keys_disagree() {
        let payload = [0x5au8; 16];
        let mut other_key = INITIAL_KEY;
        other_key[0] ^= 0xff;
        let encrypted = encrypt(&INITIAL_KEY, &payload);
        let decrypted = decrypt(&other_key, &encrypted).unwrap();
        assert_ne!(&decrypted[..], &payload[..]);
    }
}
