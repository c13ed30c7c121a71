use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceFault {
    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timeout")]
    Timeout,
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("device disconnected")]
    Disconnected,
}

impl DeviceFault {
    /// 4xx responses are validation rejections; retrying the same payload is pointless.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DeviceFault::Http { status, .. } if (400..500).contains(status))
    }
}

pub type Result<T> = std::result::Result<T, DeviceFault>;
