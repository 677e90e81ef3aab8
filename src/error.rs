use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parser error: {0}")]
    Parser(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("crc mismatch: expected {expected:08x}, computed {computed:08x}")]
    Crc { expected: u32, computed: u32 },
}

pub type Result<T> = std::result::Result<T, EsError>;
