//! Client-side key derivation and note encryption.
//!
//! The server never calls into [`seal`] or [`open`]; they exist for the
//! sending and receiving ends of the exchange. The server only ever handles
//! the [`SealedNote`] that `seal` produces.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use crate::errors::CipherError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const PBKDF2_ROUNDS: u32 = 10_000;
pub const KEY_LEN: usize = 32;
pub const BLOCK_LEN: usize = 16;
pub const SECRET_LEN: usize = 32;

pub type Key = [u8; KEY_LEN];
pub type Block = [u8; BLOCK_LEN];

/// Everything the server is allowed to see of a note.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedNote {
    pub ciphertext: Vec<u8>,
    pub iv: Block,
    pub salt: Block,
}

impl std::fmt::Debug for SealedNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedNote")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("iv", &hex::encode(self.iv))
            .field("salt", &hex::encode(self.salt))
            .finish()
    }
}

/// PBKDF2-HMAC-SHA256 over the raw UTF-8 bytes of `secret`.
pub fn derive_key(secret: &str, salt: &Block) -> Key {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// AES-256-CBC with PKCS#7 padding. The output is always a whole number of
/// blocks, and never empty.
pub fn encrypt(plaintext: &str, key: &Key, iv: &Block) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes())
}

pub fn decrypt(ciphertext: &[u8], key: &Key, iv: &Block) -> Result<String, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::DecryptionFailed);
    }

    let plain = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)?;

    String::from_utf8(plain).map_err(|_| CipherError::DecryptionFailed)
}

/// 256 random bits, hex encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn random_block() -> Block {
    let mut block = [0u8; BLOCK_LEN];
    OsRng.fill_bytes(&mut block);
    block
}

/// Encrypts `plaintext` under a key derived from `secret` with a fresh salt
/// and iv.
pub fn seal(plaintext: &str, secret: &str) -> SealedNote {
    let salt = random_block();
    let iv = random_block();
    let key = derive_key(secret, &salt);

    SealedNote {
        ciphertext: encrypt(plaintext, &key, &iv),
        iv,
        salt,
    }
}

pub fn open(sealed: &SealedNote, secret: &str) -> Result<String, CipherError> {
    let key = derive_key(secret, &sealed.salt);
    decrypt(&sealed.ciphertext, &key, &sealed.iv)
}

pub fn encode_ciphertext(ciphertext: &[u8]) -> String {
    STANDARD.encode(ciphertext)
}

pub fn decode_ciphertext(encoded: &str) -> Option<Vec<u8>> {
    STANDARD.decode(encoded.trim()).ok()
}

pub fn encode_block(block: &Block) -> String {
    hex::encode(block)
}

pub fn decode_block(encoded: &str) -> Option<Block> {
    let mut block = [0u8; BLOCK_LEN];
    hex::decode_to_slice(encoded.trim(), &mut block).ok()?;
    Some(block)
}
