//! Client-side codec for Solana data.
//!
//! This crate covers the byte-exact pieces a client needs without pulling
//! in `solana-sdk`:
//!
//! - typed byte buffers plus little-endian readers and writers;
//! - the compact (short vec) length prefix;
//! - a schema-driven Borsh-style codec for account records;
//! - public keys with seeded and program-derived address derivation;
//! - the legacy transaction message and signed transaction wire format.
//!
//! Signing uses `ed25519-dalek`, curve checks use `curve25519-dalek`, and
//! Base58 goes through `bs58`.

pub mod borsh;
pub mod buffer;
pub mod error;
pub mod keypair;
pub mod message;
pub mod metadata;
pub mod pubkey;
pub mod reader;
pub mod schema;
pub mod short_vec;
pub mod transaction;
pub mod writer;

// Re-export key public types for ergonomic imports.
pub use borsh::{CodecConfig, FieldBinding, LengthPrefix, SchemaRecord, DEFAULT_MAX_DEPTH};
pub use buffer::{ByteBuffer, Scalar, ScalarKind, ScalarTag};
pub use error::SolError;
pub use keypair::Keypair;
pub use message::{
    AccountMeta, CompiledInstruction, Instruction, Message, MessageHeader, MESSAGE_HEADER_LEN,
};
pub use metadata::{
    find_metadata_address, metadata_schema, Creator, Metadata, MetadataData, METADATA_PROGRAM_ID,
};
pub use pubkey::{
    classify_point, is_on_curve, CurvePoint, Pubkey, MAX_BUMP_SEED, MAX_SEED_LEN, PDA_MARKER,
    PUBKEY_BYTES,
};
pub use reader::BinaryReader;
pub use schema::{FieldDef, FieldType, Primitive, Record, Schema, TypeDescriptor, Value};
pub use short_vec::{decode_length, encode_length};
pub use transaction::{Transaction, SIGNATURE_BYTES, SYSTEM_PROGRAM_ID};
pub use writer::BinaryWriter;
