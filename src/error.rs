use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("login failed: {0}")]
    LoginError(String),
    #[error("user session is not active")]
    NotLoggedIn,
    #[error("invalid response: {status} - {reason}")]
    RequestFailed { status: u16, reason: String },
    #[error("rate exceeded: {0}")]
    RateExceeded(String),
    #[error("api error: {0}")]
    ApiError(String),
    #[error("command not successful: {0}")]
    CommandError(String),
    #[error("invalid data from server: {0}")]
    InvalidData(String),
    #[error("invalid contract code: {0:?}")]
    InvalidContract(String),
    #[error("{operation} is not supported by {provider}")]
    Unsupported {
        operation: &'static str,
        provider: &'static str,
    },
    #[error("unable to encode metrics")]
    FormatError,
    #[error("internal error: {0}")]
    InternalError(String),
}

impl Error {
    pub(crate) fn unsupported(operation: &'static str, provider: &'static str) -> Self {
        Error::Unsupported {
            operation,
            provider,
        }
    }
}

fn html(status: Status, error: String) -> response::Result<'static> {
    Response::build()
        .status(status)
        .sized_body(error.len(), Cursor::new(error))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::RateExceeded(s) => html(
                Status::TooManyRequests,
                format!("<html><body><h3>429 Too Many Requests</h3>Portal response: <code>{}</code></body></html>", s),
            ),
            Error::LoginError(s) => html(
                Status::Forbidden,
                format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to the portal: <code>{}</code></body></html>", s),
            ),
            _ => html(
                Status::InternalServerError,
                format!(
                    "<html><body><h3>Unknown exception</h3><code>{}</code></body></html>",
                    self
                ),
            ),
        }
    }
}
