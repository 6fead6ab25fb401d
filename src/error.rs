#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected status {status} from {path}")]
    Status { status: u16, path: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid navigation fragment: {0:?}")]
    InvalidFragment(String),

    #[error("coordinate ({x}, {y}) outside grid 1..={max_x} x 1..={max_y}")]
    OutOfRange { x: i64, y: i64, max_x: i64, max_y: i64 },

    #[error("preference storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
