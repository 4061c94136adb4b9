//! Token metadata accounts owned by the metadata program.
//!
//! Accounts are Borsh-encoded, so dynamic arrays carry a u32 count
//! ([`CodecConfig::BORSH`]). Strings on chain are padded with NUL bytes;
//! control characters are stripped from decoded strings.

use crate::borsh::{self, require, CodecConfig, FieldBinding, SchemaRecord};
use crate::error::SolError;
use crate::pubkey::Pubkey;
use crate::schema::{FieldType, Primitive, Schema, Value};

/// `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const METADATA_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    11, 112, 101, 177, 227, 209, 124, 69, 56, 157, 82, 127, 107, 4, 195, 205, 88, 184, 108, 115,
    26, 160, 253, 181, 73, 182, 209, 188, 3, 248, 41, 70,
]);

/// Leading account byte identifying a metadata (v1) account.
pub const METADATA_V1_KEY: u8 = 4;

const METADATA_SEED: &[u8] = b"metadata";

/// Metadata account address for `mint`.
pub fn find_metadata_address(mint: &Pubkey) -> Result<(Pubkey, u8), SolError> {
    Pubkey::find_program_address(
        &[METADATA_SEED, METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
}

/// Schema covering [`Metadata`] and every struct it nests.
pub fn metadata_schema() -> Schema {
    Metadata::schema()
}

fn strip_control(text: String) -> String {
    if text.chars().any(|c| c.is_ascii_control()) {
        text.chars().filter(|c| !c.is_ascii_control()).collect()
    } else {
        text
    }
}

fn flag(value: Value) -> Result<bool, SolError> {
    Ok(u8::try_from(value)? != 0)
}

fn clean_string(value: Value) -> Result<String, SolError> {
    Ok(strip_control(String::try_from(value)?))
}

// ---------------------------------------------------------------------------
// Creator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    /// Percentage share of royalties, 0..=100.
    pub share: u8,
}

#[derive(Default)]
pub struct CreatorBuilder {
    address: Option<Pubkey>,
    verified: Option<bool>,
    share: Option<u8>,
}

impl SchemaRecord for Creator {
    const TYPE_NAME: &'static str = "Creator";
    type Builder = CreatorBuilder;

    fn fields() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::<Self>::new(
                "address",
                Primitive::PubkeyAsString,
                |c| c.address.into(),
                |b, v| {
                    b.address = Some(v.try_into()?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "verified",
                Primitive::U8,
                |c| u8::from(c.verified).into(),
                |b, v| {
                    b.verified = Some(flag(v)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "share",
                Primitive::U8,
                |c| c.share.into(),
                |b, v| {
                    b.share = Some(v.try_into()?);
                    Ok(())
                },
            ),
        ]
    }

    fn build(b: CreatorBuilder) -> Result<Self, SolError> {
        Ok(Self {
            address: require(b.address, Self::TYPE_NAME, "address")?,
            verified: require(b.verified, Self::TYPE_NAME, "verified")?,
            share: require(b.share, Self::TYPE_NAME, "share")?,
        })
    }
}

// ---------------------------------------------------------------------------
// MetadataData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataData {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
}

#[derive(Default)]
pub struct MetadataDataBuilder {
    name: Option<String>,
    symbol: Option<String>,
    uri: Option<String>,
    seller_fee_basis_points: Option<u16>,
    creators: Option<Option<Vec<Creator>>>,
}

impl SchemaRecord for MetadataData {
    const TYPE_NAME: &'static str = "MetadataData";
    type Builder = MetadataDataBuilder;

    fn fields() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::<Self>::new(
                "name",
                Primitive::String,
                |d| d.name.as_str().into(),
                |b, v| {
                    b.name = Some(clean_string(v)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "symbol",
                Primitive::String,
                |d| d.symbol.as_str().into(),
                |b, v| {
                    b.symbol = Some(clean_string(v)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "uri",
                Primitive::String,
                |d| d.uri.as_str().into(),
                |b, v| {
                    b.uri = Some(clean_string(v)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "sellerFeeBasisPoints",
                Primitive::U16,
                |d| d.seller_fee_basis_points.into(),
                |b, v| {
                    b.seller_fee_basis_points = Some(v.try_into()?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "creators",
                FieldType::option(FieldType::array(FieldType::nested(Creator::TYPE_NAME))),
                |d| match &d.creators {
                    Some(list) => Value::some(Value::Array(
                        list.iter().map(|c| Value::Struct(c.to_record())).collect(),
                    )),
                    None => Value::none(),
                },
                |b, v| {
                    let creators = match v.into_option()? {
                        Some(list) => Some(
                            list.into_array()?
                                .into_iter()
                                .map(|item| Creator::from_record(item.into_record()?))
                                .collect::<Result<Vec<_>, _>>()?,
                        ),
                        None => None,
                    };
                    b.creators = Some(creators);
                    Ok(())
                },
            ),
        ]
    }

    fn build(b: MetadataDataBuilder) -> Result<Self, SolError> {
        Ok(Self {
            name: require(b.name, Self::TYPE_NAME, "name")?,
            symbol: require(b.symbol, Self::TYPE_NAME, "symbol")?,
            uri: require(b.uri, Self::TYPE_NAME, "uri")?,
            seller_fee_basis_points: require(
                b.seller_fee_basis_points,
                Self::TYPE_NAME,
                "sellerFeeBasisPoints",
            )?,
            creators: require(b.creators, Self::TYPE_NAME, "creators")?,
        })
    }

    fn register_dependencies(schema: &mut Schema) {
        Creator::register(schema);
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub key: u8,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub data: MetadataData,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
}

#[derive(Default)]
pub struct MetadataBuilder {
    key: Option<u8>,
    update_authority: Option<Pubkey>,
    mint: Option<Pubkey>,
    data: Option<MetadataData>,
    primary_sale_happened: Option<bool>,
    is_mutable: Option<bool>,
}

impl Metadata {
    /// Decode raw account data. The account must start with
    /// [`METADATA_V1_KEY`]; anything after the record is ignored.
    pub fn from_account_data(data: &[u8]) -> Result<Self, SolError> {
        match data.first() {
            Some(&METADATA_V1_KEY) => borsh::from_bytes(data, CodecConfig::BORSH),
            Some(other) => Err(SolError::MalformedInput(format!(
                "account key {other} is not a metadata account"
            ))),
            None => Err(SolError::MalformedInput("empty account data".into())),
        }
    }

    pub fn to_account_data(&self) -> Result<Vec<u8>, SolError> {
        borsh::to_bytes(self, CodecConfig::BORSH)
    }
}

impl SchemaRecord for Metadata {
    const TYPE_NAME: &'static str = "Metadata";
    type Builder = MetadataBuilder;

    fn fields() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::<Self>::new(
                "key",
                Primitive::U8,
                |m| m.key.into(),
                |b, v| {
                    b.key = Some(v.try_into()?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "updateAuthority",
                Primitive::PubkeyAsString,
                |m| m.update_authority.into(),
                |b, v| {
                    b.update_authority = Some(v.try_into()?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "mint",
                Primitive::PubkeyAsString,
                |m| m.mint.into(),
                |b, v| {
                    b.mint = Some(v.try_into()?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "data",
                FieldType::nested(MetadataData::TYPE_NAME),
                |m| Value::Struct(m.data.to_record()),
                |b, v| {
                    b.data = Some(MetadataData::from_record(v.into_record()?)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "primarySaleHappened",
                Primitive::U8,
                |m| u8::from(m.primary_sale_happened).into(),
                |b, v| {
                    b.primary_sale_happened = Some(flag(v)?);
                    Ok(())
                },
            ),
            FieldBinding::<Self>::new(
                "isMutable",
                Primitive::U8,
                |m| u8::from(m.is_mutable).into(),
                |b, v| {
                    b.is_mutable = Some(flag(v)?);
                    Ok(())
                },
            ),
        ]
    }

    fn build(b: MetadataBuilder) -> Result<Self, SolError> {
        Ok(Self {
            key: require(b.key, Self::TYPE_NAME, "key")?,
            update_authority: require(b.update_authority, Self::TYPE_NAME, "updateAuthority")?,
            mint: require(b.mint, Self::TYPE_NAME, "mint")?,
            data: require(b.data, Self::TYPE_NAME, "data")?,
            primary_sale_happened: require(
                b.primary_sale_happened,
                Self::TYPE_NAME,
                "primarySaleHappened",
            )?,
            is_mutable: require(b.is_mutable, Self::TYPE_NAME, "isMutable")?,
        })
    }

    fn register_dependencies(schema: &mut Schema) {
        MetadataData::register(schema);
    }
}
