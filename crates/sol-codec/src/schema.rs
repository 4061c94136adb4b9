//! Declarative schema and dynamic values for the Borsh-style codec.
//!
//! A [`Schema`] maps type names to [`TypeDescriptor`]s. Struct descriptors
//! list their fields in wire order; each field has a closed [`FieldType`]
//! shape that the codec interprets with a plain `match`. Encoded data is
//! carried as a tree of [`Value`]s, with [`Record`] for struct instances.

use std::collections::HashMap;
use std::fmt;

use crate::error::SolError;
use crate::pubkey::Pubkey;

/// Fixed-width (or u32-prefixed, for strings) leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    /// u32 LE byte length + UTF-8 bytes.
    String,
    /// 32 raw key bytes.
    Pubkey,
    /// 32 raw key bytes, surfaced as Base58 text.
    PubkeyAsString,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::Pubkey => "pubkey",
            Primitive::PubkeyAsString => "pubkeyAsString",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a single struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(Primitive),
    /// Exactly `N` elements, no length prefix.
    FixedArray(Box<FieldType>, usize),
    /// Length-prefixed sequence.
    Array(Box<FieldType>),
    /// Presence byte (0/1) followed by the payload when present.
    Option(Box<FieldType>),
    /// Another struct, by schema name.
    Struct(String),
}

impl FieldType {
    pub fn fixed(inner: impl Into<FieldType>, len: usize) -> Self {
        FieldType::FixedArray(Box::new(inner.into()), len)
    }

    pub fn array(inner: impl Into<FieldType>) -> Self {
        FieldType::Array(Box::new(inner.into()))
    }

    pub fn option(inner: impl Into<FieldType>) -> Self {
        FieldType::Option(Box::new(inner.into()))
    }

    pub fn nested(type_name: impl Into<String>) -> Self {
        FieldType::Struct(type_name.into())
    }

    /// `[N]` shorthand: a fixed byte array.
    pub fn bytes(len: usize) -> Self {
        FieldType::fixed(Primitive::U8, len)
    }
}

impl From<Primitive> for FieldType {
    fn from(p: Primitive) -> Self {
        FieldType::Primitive(p)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(p) => write!(f, "{p}"),
            FieldType::FixedArray(inner, n) => write!(f, "[{inner}; {n}]"),
            FieldType::Array(inner) => write!(f, "[{inner}]"),
            FieldType::Option(inner) => write!(f, "option<{inner}>"),
            FieldType::Struct(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Struct(Vec<FieldDef>),
    /// Reserved; encoding and decoding enums is not implemented.
    Enum,
}

/// Registry of type descriptors keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, TypeDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert_struct`](Self::insert_struct).
    pub fn with_struct<N, F>(mut self, name: N, fields: F) -> Self
    where
        N: Into<String>,
        F: IntoIterator<Item = (&'static str, FieldType)>,
    {
        self.insert_struct(name, fields);
        self
    }

    pub fn insert_struct<N, F>(&mut self, name: N, fields: F)
    where
        N: Into<String>,
        F: IntoIterator<Item = (&'static str, FieldType)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, ty)| FieldDef {
                name: name.to_string(),
                ty,
            })
            .collect();
        self.types.insert(name.into(), TypeDescriptor::Struct(fields));
    }

    pub fn insert_enum(&mut self, name: impl Into<String>) {
        self.types.insert(name.into(), TypeDescriptor::Enum);
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub(crate) fn lookup(&self, type_name: &str) -> Result<&TypeDescriptor, SolError> {
        self.get(type_name)
            .ok_or_else(|| SolError::schema(type_name, "type is missing from schema"))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A decoded or to-be-encoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Pubkey(Pubkey),
    Array(Vec<Value>),
    Option(Option<Box<Value>>),
    Struct(Record),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Pubkey(_) => "pubkey",
            Value::Array(_) => "array",
            Value::Option(_) => "option",
            Value::Struct(_) => "struct",
        }
    }

    pub fn some(inner: Value) -> Self {
        Value::Option(Some(Box::new(inner)))
    }

    pub fn none() -> Self {
        Value::Option(None)
    }

    pub fn bytes(bytes: &[u8]) -> Self {
        Value::Array(bytes.iter().copied().map(Value::U8).collect())
    }

    pub fn into_array(self) -> Result<Vec<Value>, SolError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(mismatch("array", &other)),
        }
    }

    pub fn into_option(self) -> Result<Option<Value>, SolError> {
        match self {
            Value::Option(inner) => Ok(inner.map(|b| *b)),
            other => Err(mismatch("option", &other)),
        }
    }

    pub fn into_record(self) -> Result<Record, SolError> {
        match self {
            Value::Struct(record) => Ok(record),
            other => Err(mismatch("struct", &other)),
        }
    }

    /// Fixed or dynamic byte array as a `Vec<u8>`.
    pub fn into_bytes(self) -> Result<Vec<u8>, SolError> {
        self.into_array()?.into_iter().map(u8::try_from).collect()
    }
}

pub(crate) fn mismatch(expected: &str, found: &Value) -> SolError {
    SolError::MalformedInput(format!("expected {expected}, found {}", found.kind()))
}

macro_rules! value_conversions {
    ($($variant:ident => $t:ty),+ $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }

            impl TryFrom<Value> for $t {
                type Error = SolError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(stringify!($t), &other)),
                    }
                }
            }
        )+
    };
}

value_conversions! {
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    F32 => f32,
    F64 => f64,
    Bool => bool,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Pubkey> for Value {
    fn from(v: Pubkey) -> Self {
        Value::Pubkey(v)
    }
}

/// Accepts either raw key values or Base58 text.
impl TryFrom<Value> for Pubkey {
    type Error = SolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Pubkey(key) => Ok(key),
            Value::String(text) => Pubkey::from_base58(&text),
            other => Err(mismatch("pubkey", &other)),
        }
    }
}

/// A struct instance: its schema type name plus named field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any previous value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Struct(record)
    }
}

impl TryFrom<Value> for Record {
    type Error = SolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.into_record()
    }
}
