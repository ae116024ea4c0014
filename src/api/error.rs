use actix_web::{
    HttpResponse, ResponseError,
    http::StatusCode,
};
use deadpool_redis::{CreatePoolError, PoolError, redis::RedisError};
use std::borrow::Cow;

use crate::ENV;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let header = ("Access-Control-Allow-Origin", ENV.frontend_url.as_str());
        let mut res = HttpResponse::build(self.status_code());

        res.insert_header(header);
        res.insert_header(("Access-Control-Allow-Credentials", "true"));

        match self {
            // Has Message
            Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Unauthorized(msg)
            | Error::BadRequest(msg)
            | Error::Forbidden(msg) => res.json(ErrorBody { message: msg.clone() }),
            // No Message
            Error::InternalServer => {
                res.json(ErrorBody { message: "Internal Server Error".into() })
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // jwt errors
    #[error("JWT Error")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    // sqlx errors
    #[error("Database Error : {0}")]
    DatabaseError(Cow<'static, str>),
    // serde errors
    #[error("JSON Serialization/Deserialization Error")]
    JsonError(#[from] serde_json::Error),
    // redis errors
    #[error(transparent)]
    PoolInit(#[from] CreatePoolError),
    #[error("Redis pool error: {0}")]
    PoolGet(#[from] PoolError),
    #[error("Redis error")]
    RedisError(#[from] RedisError),
    // Custom Errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Database Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Database Conflict: {0:?}")]
    Conflict(Option<DbErrorMeta>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn conflict_message(meta: &Option<DbErrorMeta>) -> Cow<'static, str> {
    let Some(m) = meta else {
        return "Duplicate value".into();
    };

    match m.constraint.as_deref() {
        // Partial unique index backing the duplicate friend request race
        Some("uq_friend_requests_pending_pair") => {
            "A pending friend request already exists between these users".into()
        }
        Some("friend_edges_pkey") => "Friendship already exists".into(),
        Some("conversations_pkey") => "Conversation already exists".into(),
        _ => "Duplicate value".into(),
    }
}

#[derive(Debug)]
pub struct DbErrorMeta {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub message: String,
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::BadRequest(msg) => Error::BadRequest(msg),
            SystemError::Unauthorized(msg) => Error::Unauthorized(msg),
            SystemError::Forbidden(msg) => Error::Forbidden(msg),
            SystemError::NotFound(msg) => Error::NotFound(msg),
            SystemError::Conflict(meta) => Error::Conflict(conflict_message(&meta)),
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("{:?}", err);
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::Conflict(Some(DbErrorMeta {
                        code: db_err.code().map(|s| s.to_string()),
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }));
                }
                Some("42P01") => {
                    return SystemError::NotFound("Resource not found".into());
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::DatabaseError(db_err.message().to_string().into());
                }
            }
        }
        SystemError::InternalError(Box::new(err))
    }
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Failures that are worth retrying from the client's point of view
    /// (network blips, pool exhaustion) rather than rule violations.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SystemError::DatabaseError(_)
                | SystemError::PoolGet(_)
                | SystemError::RedisError(_)
                | SystemError::InternalError(_)
        )
    }
}
