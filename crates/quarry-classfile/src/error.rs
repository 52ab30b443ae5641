use quarry_types::{DescriptorError, SignatureError};

pub type Result<T> = std::result::Result<T, Error>;

/// A decode failure. Fatal to the single class being decoded: no partial
/// `ClassInfo` is published, and callers processing many files catch the
/// error and continue with the rest of the batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid classfile magic: 0x{0:08x}")]
    InvalidMagic(u32),
    #[error("unsupported classfile version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("invalid constant pool tag: {0}")]
    InvalidConstantPoolTag(u8),
    #[error("constant pool type mismatch at index {index}: expected {expected}, found {found}")]
    ConstantPoolTypeMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid modified UTF-8 constant")]
    InvalidModifiedUtf8,
    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),
    #[error(transparent)]
    InvalidSignature(#[from] SignatureError),
    #[error("malformed {0} attribute")]
    MalformedAttribute(&'static str),
    #[error("{0}")]
    Other(&'static str),
}
