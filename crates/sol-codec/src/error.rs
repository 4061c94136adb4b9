use thiserror::Error;

/// Errors raised by the buffer, codec, key-derivation and message layers.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unexpected end of input: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("schema error for {type_name}: {reason}")]
    Schema { type_name: String, reason: String },

    #[error("field {type_name}.{field}: {reason}")]
    Field {
        type_name: String,
        field: String,
        reason: String,
    },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("signing error: {0}")]
    Signing(String),
}

impl SolError {
    pub(crate) fn schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SolError::Schema {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Attach the enclosing struct and field to an error raised while
    /// encoding or decoding that field's value.
    pub(crate) fn in_field(self, type_name: &str, field: &str) -> Self {
        SolError::Field {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason: self.to_string(),
        }
    }
}
