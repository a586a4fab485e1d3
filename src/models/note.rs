use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable};
use serde_derive::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::crypto::{self, SealedNote, BLOCK_LEN};
use crate::errors::{CommonError, Fields, StoreError};
use crate::schema::notes;

/// A stored note. The secret it was sealed with is never part of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: String,
    pub sealed: SealedNote,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl NoteRecord {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at <= now
    }
}

/// Body of `POST /api/notes`. Every field is optional here so a missing one
/// can be reported as a field error instead of a generic parse failure.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub encrypted_content: Option<String>,
    pub iv: Option<String>,
    pub salt: Option<String>,
}

impl NewNote {
    pub fn from_sealed(sealed: &SealedNote) -> Self {
        NewNote {
            encrypted_content: Some(crypto::encode_ciphertext(&sealed.ciphertext)),
            iv: Some(crypto::encode_block(&sealed.iv)),
            salt: Some(crypto::encode_block(&sealed.salt)),
        }
    }

    /// Checks every field and reports all problems at once.
    pub fn into_sealed(self) -> Result<SealedNote, Vec<Fields>> {
        let mut errors = vec![];

        let ciphertext = match non_empty(self.encrypted_content) {
            None => {
                errors.push(Fields::EncryptedContent(CommonError::Missing));
                None
            }
            Some(encoded) => match crypto::decode_ciphertext(&encoded) {
                None => {
                    errors.push(Fields::EncryptedContent(CommonError::Malformed));
                    None
                }
                Some(bytes) if bytes.is_empty() || bytes.len() % BLOCK_LEN != 0 => {
                    errors.push(Fields::EncryptedContent(CommonError::WrongLength));
                    None
                }
                Some(bytes) => Some(bytes),
            },
        };

        let iv = parse_block(self.iv).map_err(|e| errors.push(Fields::Iv(e))).ok();
        let salt = parse_block(self.salt).map_err(|e| errors.push(Fields::Salt(e))).ok();

        match (ciphertext, iv, salt) {
            (Some(ciphertext), Some(iv), Some(salt)) if errors.is_empty() => Ok(SealedNote {
                ciphertext,
                iv,
                salt,
            }),
            _ => Err(errors),
        }
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

fn parse_block(field: Option<String>) -> Result<[u8; BLOCK_LEN], CommonError> {
    let encoded = non_empty(field).ok_or(CommonError::Missing)?;
    let bytes = hex::decode(encoded.trim()).map_err(|_| CommonError::Malformed)?;
    bytes.try_into().map_err(|_| CommonError::WrongLength)
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CreatedId {
    pub id: String,
}

/// Body of a successful `GET /api/notes/{id}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedNote {
    pub encrypted_content: String,
    pub iv: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

impl From<&NoteRecord> for FetchedNote {
    fn from(record: &NoteRecord) -> Self {
        FetchedNote {
            encrypted_content: crypto::encode_ciphertext(&record.sealed.ciphertext),
            iv: crypto::encode_block(&record.sealed.iv),
            salt: crypto::encode_block(&record.sealed.salt),
            created_at: record.created_at.into(),
        }
    }
}

impl FetchedNote {
    /// `None` when the server handed back something that cannot be a sealed
    /// note; the reader treats that the same as a failed decryption.
    pub fn into_sealed(self) -> Option<SealedNote> {
        Some(SealedNote {
            ciphertext: crypto::decode_ciphertext(&self.encrypted_content)?,
            iv: crypto::decode_block(&self.iv)?,
            salt: crypto::decode_block(&self.salt)?,
        })
    }
}

#[derive(Clone, Debug, Queryable, Insertable)]
#[diesel(table_name = notes)]
pub struct NoteRow {
    pub id: String,
    pub encrypted_content: Vec<u8>,
    pub iv: Vec<u8>,
    pub salt: Vec<u8>,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl From<&NoteRecord> for NoteRow {
    fn from(record: &NoteRecord) -> Self {
        NoteRow {
            id: record.id.clone(),
            encrypted_content: record.sealed.ciphertext.clone(),
            iv: record.sealed.iv.to_vec(),
            salt: record.sealed.salt.to_vec(),
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

impl TryFrom<NoteRow> for NoteRecord {
    type Error = StoreError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let corrupt = |column: &str| {
            StoreError::Unavailable(format!("note {} has a corrupt {} column", row.id, column))
        };
        let iv = row.iv.as_slice().try_into().map_err(|_| corrupt("iv"))?;
        let salt = row.salt.as_slice().try_into().map_err(|_| corrupt("salt"))?;

        Ok(NoteRecord {
            sealed: SealedNote {
                ciphertext: row.encrypted_content,
                iv,
                salt,
            },
            id: row.id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}
