//! Ed25519 public keys and address derivation.
//!
//! An address is simply the 32 raw bytes of an Ed25519 public key, shown to
//! humans as Base58 (standard Bitcoin alphabet via the `bs58` crate). Two
//! derived address schemes are supported:
//!
//! - seeded addresses: `SHA-256(base || seed || owner)`, no curve check;
//! - program-derived addresses (PDAs):
//!   `SHA-256(seed_0 || ... || seed_n || program_id || "ProgramDerivedAddress")`,
//!   which must NOT be a valid curve point so no private key can sign for it.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

use crate::error::SolError;

/// Length of a public key in bytes.
pub const PUBKEY_BYTES: usize = 32;

/// Maximum length of a single PDA seed.
pub const MAX_SEED_LEN: usize = 32;

/// Suffix appended to every PDA hash input.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// First bump seed tried by [`Pubkey::find_program_address`].
pub const MAX_BUMP_SEED: u8 = 255;

/// A 32-byte Ed25519 public key / account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build a key from exactly 32 raw bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, SolError> {
        let arr: [u8; PUBKEY_BYTES] = bytes.try_into().map_err(|_| {
            SolError::InvalidPublicKey(format!(
                "expected {PUBKEY_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Decode a Base58 address.
    pub fn from_base58(address: &str) -> Result<Self, SolError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

        let arr: [u8; PUBKEY_BYTES] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::InvalidAddress(format!("expected {PUBKEY_BYTES} bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }

    /// Build a key from either raw bytes or Base58 text.
    ///
    /// Input containing anything other than printable ASCII, tab, CR or LF
    /// is taken as raw key bytes; everything else is decoded as Base58.
    /// Either way the result must be exactly 32 bytes.
    pub fn parse(input: &[u8]) -> Result<Self, SolError> {
        let is_binary = input
            .iter()
            .any(|&b| !matches!(b, 0x20..=0x7e | b'\t' | b'\r' | b'\n'));

        if is_binary {
            return Self::try_from_slice(input);
        }

        // Printable ASCII is always valid UTF-8.
        let text = std::str::from_utf8(input)
            .map_err(|e| SolError::InvalidAddress(format!("address is not text: {e}")))?;
        Self::from_base58(text).map_err(|e| match e {
            SolError::InvalidAddress(reason) => SolError::InvalidPublicKey(reason),
            other => other,
        })
    }

    /// A key with all 32 bytes set to `fill`. `filled(0)` is the default
    /// (system program) address.
    pub const fn filled(fill: u8) -> Self {
        Self([fill; PUBKEY_BYTES])
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn to_bytes(&self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    pub fn as_array(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Derive `SHA-256(base || seed || owner)`. The result is used as-is;
    /// it may or may not lie on the curve.
    pub fn create_with_seed(base: &Pubkey, seed: &str, owner: &Pubkey) -> Pubkey {
        let mut hasher = Sha256::new();
        hasher.update(base.0);
        hasher.update(seed.as_bytes());
        hasher.update(owner.0);
        Pubkey(hasher.finalize().into())
    }

    /// Derive a program address from `seeds` and `program_id`.
    ///
    /// Fails if any seed is longer than [`MAX_SEED_LEN`] or if the hash
    /// lands on the Ed25519 curve.
    pub fn create_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<Pubkey, SolError> {
        check_seeds(seeds)?;

        let hash = hash_program_address(seeds, None, program_id);
        if is_on_curve(&hash) {
            return Err(SolError::Derivation(
                "invalid seeds, address must fall off the curve".into(),
            ));
        }

        Ok(Pubkey(hash))
    }

    /// Search for a valid program address by appending a one-byte bump seed.
    ///
    /// Bumps are tried strictly in descending order from 255 down to 1; the
    /// first off-curve result wins, so the returned bump is the highest one
    /// that works. Bump 0 is never tried.
    pub fn find_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<(Pubkey, u8), SolError> {
        check_seeds(seeds)?;

        let mut bump = MAX_BUMP_SEED;
        while bump != 0 {
            let hash = hash_program_address(seeds, Some(bump), program_id);
            if !is_on_curve(&hash) {
                log::debug!(
                    "found program address for {} with bump {bump}",
                    program_id
                );
                return Ok((Pubkey(hash), bump));
            }
            log::trace!("bump {bump} lands on curve, retrying");
            bump -= 1;
        }

        Err(SolError::Derivation(
            "unable to find a viable program address nonce".into(),
        ))
    }

    pub fn is_on_curve(&self) -> bool {
        is_on_curve(&self.0)
    }

    /// Convert to the Montgomery (X25519) form of the same point.
    ///
    /// Fails for bytes that are not a curve point and for small-order points,
    /// which have no usable Diffie-Hellman counterpart.
    pub fn to_curve25519(&self) -> Result<[u8; 32], SolError> {
        let point = CompressedEdwardsY(self.0)
            .decompress()
            .ok_or_else(|| SolError::InvalidPublicKey("not a valid Ed25519 point".into()))?;
        if point.is_small_order() {
            return Err(SolError::InvalidPublicKey(
                "public key is a small-order point".into(),
            ));
        }
        Ok(point.to_montgomery().to_bytes())
    }
}

/// Where a candidate key's bytes fall relative to the Ed25519 curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurvePoint {
    /// The bytes do not decompress to a curve point.
    OffCurve,
    /// A valid point of small order (a torsion point).
    SmallOrder,
    /// A valid point usable as a signing key.
    OnCurve,
}

/// Classify 32 bytes as a compressed Edwards point.
///
/// Only a failed decompression counts as off-curve. Membership means the
/// bytes decompress, so points outside the prime-order subgroup are still
/// on the curve.
pub fn classify_point(bytes: &[u8; 32]) -> CurvePoint {
    match CompressedEdwardsY(*bytes).decompress() {
        None => CurvePoint::OffCurve,
        Some(point) if point.is_small_order() => CurvePoint::SmallOrder,
        Some(_) => CurvePoint::OnCurve,
    }
}

/// True if the bytes are any point on the curve, small-order included.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    classify_point(bytes) != CurvePoint::OffCurve
}

fn check_seeds(seeds: &[&[u8]]) -> Result<(), SolError> {
    for (i, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(SolError::Derivation(format!(
                "max seed length exceeded: seed {i} is {} bytes",
                seed.len()
            )));
        }
    }
    Ok(())
}

fn hash_program_address(seeds: &[&[u8]], bump: Option<u8>, program_id: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    if let Some(bump) = bump {
        hasher.update([bump]);
    }
    hasher.update(program_id.0);
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

impl FromStr for Pubkey {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = SolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from_slice(bytes)
    }
}

impl TryFrom<Vec<u8>> for Pubkey {
    type Error = SolError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from_slice(&bytes)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Pubkey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Pubkey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Pubkey::from_base58(&text).map_err(serde::de::Error::custom)
    }
}
