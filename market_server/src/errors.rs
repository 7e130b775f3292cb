use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use market_engine::{NegotiationApiError, OrderApiError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication required. {0}")]
    Unauthenticated(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    /// The request was well-formed but refused by a business rule. The message carries the machine-readable reason
    /// code for clients.
    #[error("{0}")]
    ValidationError(String),
    #[error("The resource already exists. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            // Internals are logged, never surfaced.
            error!("💻️ Internal server error: {self}");
            return HttpResponse::build(self.status_code())
                .insert_header(ContentType::json())
                .body(serde_json::json!({ "error": "Internal server error" }).to_string());
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn store_error_to_server_error(e: StoreError) -> ServerError {
    match e {
        StoreError::SessionNotFound(id) => ServerError::NoRecordFound(format!("Offer session {id} not found")),
        StoreError::OrderNotFound(id) => ServerError::NoRecordFound(format!("Order {id} not found")),
        StoreError::ListingNotFound(_) | StoreError::ServiceNotFound(_) => ServerError::ValidationError(e.to_string()),
        StoreError::SessionNotActive(_) | StoreError::InsufficientStock { .. } | StoreError::IllegalStatusChange(_) => {
            ServerError::ValidationError(e.to_string())
        },
        StoreError::ThreadAlreadyExists(id) => ServerError::Conflict(format!("A thread already exists for session {id}")),
        StoreError::DatabaseError(_) | StoreError::EmptyOfferChain(_) | StoreError::OfferNotFound(_) => {
            ServerError::BackendError(e.to_string())
        },
    }
}

impl From<NegotiationApiError> for ServerError {
    fn from(e: NegotiationApiError) -> Self {
        match e {
            NegotiationApiError::StoreError(inner) => store_error_to_server_error(inner),
            NegotiationApiError::SessionNotFound(id) => {
                ServerError::NoRecordFound(format!("Offer session {id} not found"))
            },
            NegotiationApiError::Forbidden { .. } => ServerError::InsufficientPermissions(e.to_string()),
            NegotiationApiError::MergeRejected(reason) => ServerError::ValidationError(reason.to_string()),
            NegotiationApiError::NotEnoughSessions | NegotiationApiError::ServiceOwnerMismatch { .. } => {
                ServerError::ValidationError(e.to_string())
            },
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::StoreError(inner) => store_error_to_server_error(inner),
            OrderApiError::OrderNotFound(id) => ServerError::NoRecordFound(format!("Order {id} not found")),
            OrderApiError::Forbidden { .. } => ServerError::InsufficientPermissions(e.to_string()),
            OrderApiError::TerminalStatus { .. } | OrderApiError::StatusNoOp(_) => {
                ServerError::ValidationError(e.to_string())
            },
        }
    }
}
