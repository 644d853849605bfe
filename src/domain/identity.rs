//! Fixed-width identifiers used by the registry: module identities, call
//! selectors and capability ids.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Decodes `0x`-prefixed hex into exactly `N` bytes, left-padding short input
/// with zeros.
fn decode_hex<const N: usize>(input: &str) -> Result<[u8; N]> {
    let digits = input
        .trim()
        .strip_prefix("0x")
        .or_else(|| input.trim().strip_prefix("0X"))
        .ok_or_else(|| RegistryError::MalformedInput(format!("{input:?} is not 0x-prefixed")))?;

    if !digits.is_ascii() || digits.is_empty() || digits.len() > N * 2 {
        return Err(RegistryError::MalformedInput(format!(
            "{input:?} must carry between 1 and {} hex digits",
            N * 2
        )));
    }

    let padded = format!("{:0>width$}", digits, width = N * 2);
    let mut out = [0u8; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&padded[i * 2..i * 2 + 2], 16).map_err(|_| {
            RegistryError::MalformedInput(format!("{input:?} contains non-hex characters"))
        })?;
    }
    Ok(out)
}

macro_rules! hex_string_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A 20-byte identity naming a deployed module or a caller.
///
/// The all-zero value is the sentinel "none" identity: it never has code and
/// is the only handler a Remove cut may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity([u8; 20]);

impl Identity {
    pub const NONE: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Builds an identity whose low 8 bytes hold `value` big-endian.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

impl FromStr for Identity {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex::<20>(s).map(Self)
    }
}

hex_string_serde!(Identity);

/// A 4-byte call identifier derived from a call signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; 4]);

impl Selector {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// First four bytes of the SHA-256 digest of `signature`.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Reads the leading selector of `calldata`, if it is long enough.
    pub fn from_calldata(calldata: &[u8]) -> Option<Self> {
        let head: [u8; 4] = calldata.get(..4)?.try_into().ok()?;
        Some(Self(head))
    }

    /// Accepts either a `0x`-prefixed selector or a call signature.
    pub fn parse_or_derive(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            trimmed.parse()
        } else if trimmed.is_empty() {
            Err(RegistryError::MalformedInput(
                "selector must not be empty".to_string(),
            ))
        } else {
            Ok(Self::from_signature(trimmed))
        }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Prefixes `payload` with this selector, producing dispatchable calldata.
    pub fn encode_call(&self, payload: &[u8]) -> Vec<u8> {
        let mut calldata = Vec::with_capacity(4 + payload.len());
        calldata.extend_from_slice(&self.0);
        calldata.extend_from_slice(payload);
        calldata
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

impl FromStr for Selector {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex::<4>(s).map(Self)
    }
}

hex_string_serde!(Selector);

/// Identifier of an interface the deployed system advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityId([u8; 4]);

impl CapabilityId {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The XOR of every selector in an interface.
    pub fn from_selectors(selectors: &[Selector]) -> Self {
        let mut acc = [0u8; 4];
        for selector in selectors {
            for (a, b) in acc.iter_mut().zip(selector.as_bytes()) {
                *a ^= b;
            }
        }
        Self(acc)
    }

    pub fn from_signatures(signatures: &[&str]) -> Self {
        let selectors: Vec<Selector> = signatures
            .iter()
            .map(|sig| Selector::from_signature(sig))
            .collect();
        Self::from_selectors(&selectors)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

impl FromStr for CapabilityId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex::<4>(s).map(Self)
    }
}

hex_string_serde!(CapabilityId);
