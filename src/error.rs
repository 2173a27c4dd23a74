use thiserror::Error;

use crate::{point::NumericKind, MetricKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no {0} configured")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("not connected")]
    NotConnected,
    /// The point cannot be encoded; nothing was sent.
    #[error("invalid point; err={0}")]
    InvalidPoint(String),
    /// The backend answered with a non-success status.
    #[error("backend rejected write; status={code}, body={body}")]
    Status { code: u16, body: String },
    #[error("transport; err={0}")]
    Transport(String),
}
impl From<ureq::Error> for WriteError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                Self::Status { code, body }
            }
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    #[error("counter `{key}` holds {stored} values; cannot add {given} delta")]
    KindMismatch {
        key: MetricKey,
        stored: NumericKind,
        given: NumericKind,
    },
}
