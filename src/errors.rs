use actix_web::{http::StatusCode, HttpResponse};
use derive_more::Display;
use serde_derive::Serialize;
use serde_json::json;

/// Raised by the cipher engine. A wrong secret, a wrong salt or iv and a
/// corrupted ciphertext are deliberately reported the same way.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[display(fmt = "failed to decrypt note: invalid key or corrupted data")]
    DecryptionFailed,
}

impl std::error::Error for CipherError {}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[display(fmt = "note id {} already exists", _0)]
    DuplicateId(String),
    #[display(fmt = "note store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> StoreError {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> StoreError {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[display(fmt = "invalid input: {}", _0)]
    Validation(String),
    // never-existed, already-read and expired all look like this
    #[display(fmt = "note not found or already deleted")]
    NotFound,
    #[display(fmt = "{}", CipherError::DecryptionFailed)]
    DecryptionFailed,
    #[display(fmt = "{}", _0)]
    Store(StoreError),
    #[display(fmt = "configured note lifetime runs past the end of the clock")]
    LifetimeOverflow,
}

impl ExchangeError {
    /// Only a store outage is worth retrying; every other failure is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Store(StoreError::Unavailable(_)))
    }
}

impl std::error::Error for ExchangeError {}

impl From<StoreError> for ExchangeError {
    fn from(err: StoreError) -> ExchangeError {
        ExchangeError::Store(err)
    }
}

impl From<CipherError> for ExchangeError {
    fn from(_: CipherError) -> ExchangeError {
        ExchangeError::DecryptionFailed
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "invalid value for {}: {:?}", var, value)]
    Invalid { var: &'static str, value: String },
    #[display(fmt = "rate limit settings rejected")]
    RateLimit,
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommonError {
    Missing,
    Malformed,
    WrongLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "field", content = "problem")]
pub enum Fields {
    EncryptedContent(CommonError),
    Iv(CommonError),
    Salt(CommonError),
}

#[derive(Debug, Display)]
pub enum ServerError {
    #[display(fmt = "Missing or malformed fields")]
    UserError(Vec<Fields>),
    #[display(fmt = "Invalid request: {}", _0)]
    BadRequest(String),
    #[display(fmt = "Note not found or already deleted")]
    NotFound,
    #[display(fmt = "Note store unavailable")]
    StoreUnavailable,
    #[display(fmt = "Note id collision")]
    DuplicateId,
    #[display(fmt = "Blocking pool failure")]
    BlockingError,
    #[display(fmt = "Server misconfigured")]
    Misconfigured,
}

impl From<ExchangeError> for ServerError {
    fn from(err: ExchangeError) -> ServerError {
        match err {
            ExchangeError::Validation(msg) => ServerError::BadRequest(msg),
            ExchangeError::NotFound => ServerError::NotFound,
            // the server never decrypts, so this only surfaces through misuse
            ExchangeError::DecryptionFailed => ServerError::BadRequest(err.to_string()),
            ExchangeError::Store(StoreError::DuplicateId(_)) => ServerError::DuplicateId,
            ExchangeError::Store(StoreError::Unavailable(_)) => ServerError::StoreUnavailable,
            ExchangeError::LifetimeOverflow => ServerError::Misconfigured,
        }
    }
}

impl From<actix_web::error::BlockingError> for ServerError {
    fn from(_: actix_web::error::BlockingError) -> ServerError {
        ServerError::BlockingError
    }
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UserError(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::DuplicateId | ServerError::BlockingError | ServerError::Misconfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ServerError::UserError(fields) => json!({
                "error": "Missing required fields",
                "fields": fields,
            }),
            ServerError::DuplicateId
            | ServerError::StoreUnavailable
            | ServerError::BlockingError
            | ServerError::Misconfigured => json!({ "error": "Failed to process note" }),
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
