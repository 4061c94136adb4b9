//! Schema-driven binary codec.
//!
//! Encoding walks a struct descriptor in declared field order and writes
//! each field according to its [`FieldType`]:
//!
//!   primitive        fixed-width little-endian (strings: u32 len + bytes)
//!   [T; N]           N elements, no prefix; input length must equal N
//!   [T]              sequence prefix, then each element
//!   option<T>        0x00, or 0x01 followed by T
//!   Struct(name)     the named struct, recursively
//!
//! The sequence prefix of dynamic arrays is chosen by [`CodecConfig`]. The
//! default is the compact (short vec) length; on-chain Borsh accounts use a
//! u32 LE count. Struct nesting is capped at `max_depth` levels so a
//! self-referential schema cannot recurse without bound.
//!
//! Typed values plug in via [`SchemaRecord`]: a type lists its fields as
//! `(name, type, getter, setter)` bindings, decoding fills a builder, and a
//! single `build` call produces the final value.

use crate::error::SolError;
use crate::reader::BinaryReader;
use crate::schema::{mismatch, FieldType, Primitive, Record, Schema, TypeDescriptor, Value};
use crate::writer::{u32_len, BinaryWriter};

/// How dynamic arrays announce their element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPrefix {
    /// Compact (short vec) varint.
    #[default]
    Compact,
    /// u32 little-endian.
    U32,
}

/// Struct nesting allowed by the preset configs.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub sequence_prefix: LengthPrefix,
    /// Deepest struct nesting accepted, counting the top-level record as 1.
    pub max_depth: usize,
}

impl CodecConfig {
    pub const COMPACT: CodecConfig = CodecConfig {
        sequence_prefix: LengthPrefix::Compact,
        max_depth: DEFAULT_MAX_DEPTH,
    };

    /// Layout used by Borsh-encoded program accounts.
    pub const BORSH: CodecConfig = CodecConfig {
        sequence_prefix: LengthPrefix::U32,
        max_depth: DEFAULT_MAX_DEPTH,
    };

    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn enter(&self, depth: &mut usize, type_name: &str) -> Result<(), SolError> {
        if *depth >= self.max_depth {
            return Err(SolError::MalformedInput(format!(
                "{type_name} nested deeper than {} levels",
                self.max_depth
            )));
        }
        *depth += 1;
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::COMPACT
    }
}

// ---------------------------------------------------------------------------
// Dynamic entry points
// ---------------------------------------------------------------------------

/// Encode `record` as the struct named by its type name.
pub fn serialize(schema: &Schema, record: &Record) -> Result<Vec<u8>, SolError> {
    serialize_with(schema, record, CodecConfig::default())
}

pub fn serialize_with(
    schema: &Schema,
    record: &Record,
    config: CodecConfig,
) -> Result<Vec<u8>, SolError> {
    let mut encoder = Encoder {
        schema,
        config,
        depth: 0,
        writer: BinaryWriter::new(),
    };
    encoder.encode_struct(record.type_name(), record)?;
    Ok(encoder.writer.into_bytes())
}

/// Decode a `type_name` struct from the front of `bytes`. Trailing bytes are
/// left unread.
pub fn deserialize(schema: &Schema, type_name: &str, bytes: &[u8]) -> Result<Record, SolError> {
    deserialize_with(schema, type_name, bytes, CodecConfig::default())
}

pub fn deserialize_with(
    schema: &Schema,
    type_name: &str,
    bytes: &[u8],
    config: CodecConfig,
) -> Result<Record, SolError> {
    let mut decoder = Decoder {
        schema,
        config,
        depth: 0,
        reader: BinaryReader::new(bytes),
    };
    let record = decoder.decode_struct(type_name)?;
    log::debug!(
        "decoded {type_name}: {} of {} bytes consumed",
        decoder.reader.offset(),
        bytes.len()
    );
    Ok(record)
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

struct Encoder<'s> {
    schema: &'s Schema,
    config: CodecConfig,
    depth: usize,
    writer: BinaryWriter,
}

impl Encoder<'_> {
    fn encode_struct(&mut self, type_name: &str, record: &Record) -> Result<(), SolError> {
        self.config.enter(&mut self.depth, type_name)?;
        self.encode_fields(type_name, record)?;
        self.depth -= 1;
        Ok(())
    }

    fn encode_fields(&mut self, type_name: &str, record: &Record) -> Result<(), SolError> {
        let fields = match self.schema.lookup(type_name)? {
            TypeDescriptor::Struct(fields) => fields,
            TypeDescriptor::Enum => {
                return Err(SolError::NotImplemented(format!(
                    "enum schema kind for {type_name}"
                )))
            }
        };

        for field in fields {
            let value = record.get(&field.name).ok_or_else(|| SolError::Field {
                type_name: type_name.to_string(),
                field: field.name.clone(),
                reason: "no value supplied".into(),
            })?;
            self.encode_value(&field.ty, value)
                .map_err(|e| e.in_field(type_name, &field.name))?;
        }
        Ok(())
    }

    fn encode_value(&mut self, ty: &FieldType, value: &Value) -> Result<(), SolError> {
        match ty {
            FieldType::Primitive(p) => self.encode_primitive(*p, value),
            FieldType::FixedArray(inner, len) => {
                let items = as_items(value)?;
                if items.len() != *len {
                    return Err(SolError::MalformedInput(format!(
                        "expected fixed array of {len} elements, got {}",
                        items.len()
                    )));
                }
                items.iter().try_for_each(|item| self.encode_value(inner, item))
            }
            FieldType::Array(inner) => {
                let items = as_items(value)?;
                match self.config.sequence_prefix {
                    LengthPrefix::Compact => self.writer.write_compact_length(items.len()),
                    LengthPrefix::U32 => self.writer.write_u32(u32_len(items.len())?),
                }
                items.iter().try_for_each(|item| self.encode_value(inner, item))
            }
            FieldType::Option(inner) => match value {
                Value::Option(None) => {
                    self.writer.write_u8(0);
                    Ok(())
                }
                Value::Option(Some(present)) => {
                    self.writer.write_u8(1);
                    self.encode_value(inner, present)
                }
                other => Err(mismatch("option", other)),
            },
            FieldType::Struct(name) => match value {
                Value::Struct(record) => self.encode_struct(name, record),
                other => Err(mismatch(name, other)),
            },
        }
    }

    fn encode_primitive(&mut self, p: Primitive, value: &Value) -> Result<(), SolError> {
        let w = &mut self.writer;
        match (p, value) {
            (Primitive::U8, Value::U8(v)) => w.write_u8(*v),
            (Primitive::U16, Value::U16(v)) => w.write_u16(*v),
            (Primitive::U32, Value::U32(v)) => w.write_u32(*v),
            (Primitive::U64, Value::U64(v)) => w.write_u64(*v),
            (Primitive::I8, Value::I8(v)) => w.write_i8(*v),
            (Primitive::I16, Value::I16(v)) => w.write_i16(*v),
            (Primitive::I32, Value::I32(v)) => w.write_i32(*v),
            (Primitive::I64, Value::I64(v)) => w.write_i64(*v),
            (Primitive::F32, Value::F32(v)) => w.write_f32(*v),
            (Primitive::F64, Value::F64(v)) => w.write_f64(*v),
            (Primitive::Bool, Value::Bool(v)) => w.write_bool(*v),
            (Primitive::String, Value::String(s)) => w.write_string(s)?,
            (Primitive::Pubkey | Primitive::PubkeyAsString, Value::Pubkey(key)) => {
                w.write_pubkey(key)
            }
            (Primitive::Pubkey | Primitive::PubkeyAsString, Value::String(text)) => {
                w.write_pubkey_as_string(text)?
            }
            (p, other) => return Err(mismatch(p.name(), other)),
        }
        Ok(())
    }
}

fn as_items(value: &Value) -> Result<&[Value], SolError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(mismatch("array", other)),
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

struct Decoder<'s, 'b> {
    schema: &'s Schema,
    config: CodecConfig,
    depth: usize,
    reader: BinaryReader<'b>,
}

impl Decoder<'_, '_> {
    fn decode_struct(&mut self, type_name: &str) -> Result<Record, SolError> {
        self.config.enter(&mut self.depth, type_name)?;
        let record = self.decode_fields(type_name)?;
        self.depth -= 1;
        Ok(record)
    }

    fn decode_fields(&mut self, type_name: &str) -> Result<Record, SolError> {
        let fields = match self.schema.lookup(type_name)? {
            TypeDescriptor::Struct(fields) => fields,
            TypeDescriptor::Enum => {
                return Err(SolError::NotImplemented(format!(
                    "enum schema kind for {type_name}"
                )))
            }
        };

        let mut record = Record::new(type_name);
        for field in fields {
            let value = self
                .decode_value(&field.ty)
                .map_err(|e| e.in_field(type_name, &field.name))?;
            log::trace!(
                "{type_name}.{} = {} (offset {})",
                field.name,
                value.kind(),
                self.reader.offset()
            );
            record.insert(field.name.clone(), value);
        }
        Ok(record)
    }

    fn decode_value(&mut self, ty: &FieldType) -> Result<Value, SolError> {
        match ty {
            FieldType::Primitive(p) => self.decode_primitive(*p),
            FieldType::FixedArray(inner, len) => self.decode_items(inner, *len),
            FieldType::Array(inner) => {
                let len = match self.config.sequence_prefix {
                    LengthPrefix::Compact => self.reader.read_compact_length()?,
                    LengthPrefix::U32 => self.reader.read_u32()? as usize,
                };
                self.decode_items(inner, len)
            }
            FieldType::Option(inner) => match self.reader.read_u8()? {
                0 => Ok(Value::none()),
                1 => Ok(Value::some(self.decode_value(inner)?)),
                tag => Err(SolError::MalformedInput(format!(
                    "invalid option tag {tag:#04x}"
                ))),
            },
            FieldType::Struct(name) => Ok(Value::Struct(self.decode_struct(name)?)),
        }
    }

    fn decode_items(&mut self, inner: &FieldType, len: usize) -> Result<Value, SolError> {
        // Every element takes at least one byte, so cap the reservation.
        let mut items = Vec::with_capacity(len.min(self.reader.remaining()));
        for _ in 0..len {
            items.push(self.decode_value(inner)?);
        }
        Ok(Value::Array(items))
    }

    fn decode_primitive(&mut self, p: Primitive) -> Result<Value, SolError> {
        let r = &mut self.reader;
        Ok(match p {
            Primitive::U8 => Value::U8(r.read_u8()?),
            Primitive::U16 => Value::U16(r.read_u16()?),
            Primitive::U32 => Value::U32(r.read_u32()?),
            Primitive::U64 => Value::U64(r.read_u64()?),
            Primitive::I8 => Value::I8(r.read_i8()?),
            Primitive::I16 => Value::I16(r.read_i16()?),
            Primitive::I32 => Value::I32(r.read_i32()?),
            Primitive::I64 => Value::I64(r.read_i64()?),
            Primitive::F32 => Value::F32(r.read_f32()?),
            Primitive::F64 => Value::F64(r.read_f64()?),
            Primitive::Bool => Value::Bool(r.read_bool()?),
            Primitive::String => Value::String(r.read_string()?),
            Primitive::Pubkey => Value::Pubkey(r.read_pubkey()?),
            Primitive::PubkeyAsString => Value::String(r.read_pubkey_as_string()?),
        })
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// One field of a [`SchemaRecord`]: wire name, wire type, and plain function
/// pointers that read it off a value and store it into the builder.
pub struct FieldBinding<T: SchemaRecord> {
    pub name: &'static str,
    pub ty: FieldType,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T::Builder, Value) -> Result<(), SolError>,
}

impl<T: SchemaRecord> FieldBinding<T> {
    pub fn new(
        name: &'static str,
        ty: impl Into<FieldType>,
        get: fn(&T) -> Value,
        set: fn(&mut T::Builder, Value) -> Result<(), SolError>,
    ) -> Self {
        Self {
            name,
            ty: ty.into(),
            get,
            set,
        }
    }
}

/// A Rust type with a fixed struct layout in the schema codec.
pub trait SchemaRecord: Sized {
    /// Schema key for this type.
    const TYPE_NAME: &'static str;

    /// Collects decoded field values before [`build`](Self::build).
    type Builder: Default;

    /// Field bindings in wire order.
    fn fields() -> Vec<FieldBinding<Self>>;

    fn build(builder: Self::Builder) -> Result<Self, SolError>;

    /// Register every nested struct this type refers to.
    fn register_dependencies(_schema: &mut Schema) {}

    fn register(schema: &mut Schema) {
        Self::register_dependencies(schema);
        schema.insert_struct(
            Self::TYPE_NAME,
            Self::fields().into_iter().map(|b| (b.name, b.ty)),
        );
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        Self::register(&mut schema);
        schema
    }

    fn to_record(&self) -> Record {
        Self::fields()
            .into_iter()
            .fold(Record::new(Self::TYPE_NAME), |record, b| {
                record.with(b.name, (b.get)(self))
            })
    }

    fn from_record(mut record: Record) -> Result<Self, SolError> {
        let mut builder = Self::Builder::default();
        for binding in Self::fields() {
            let value = record.take(binding.name).ok_or_else(|| SolError::Field {
                type_name: Self::TYPE_NAME.to_string(),
                field: binding.name.to_string(),
                reason: "missing from record".into(),
            })?;
            (binding.set)(&mut builder, value)
                .map_err(|e| e.in_field(Self::TYPE_NAME, binding.name))?;
        }
        Self::build(builder)
    }
}

pub fn to_bytes<T: SchemaRecord>(value: &T, config: CodecConfig) -> Result<Vec<u8>, SolError> {
    serialize_with(&T::schema(), &value.to_record(), config)
}

pub fn from_bytes<T: SchemaRecord>(bytes: &[u8], config: CodecConfig) -> Result<T, SolError> {
    let record = deserialize_with(&T::schema(), T::TYPE_NAME, bytes, config)?;
    T::from_record(record)
}

/// Unwrap a builder slot, naming the field if it was never filled.
pub fn require<V>(slot: Option<V>, type_name: &str, field: &str) -> Result<V, SolError> {
    slot.ok_or_else(|| SolError::Field {
        type_name: type_name.to_string(),
        field: field.to_string(),
        reason: "value never set".into(),
    })
}
