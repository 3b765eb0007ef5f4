use super::errors::{ErrorKind, Result};
use failchain::{bail, ensure};
use serde::de::{Deserialize, Deserializer};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::str::{self, FromStr};

/// An 8-byte, null-padded, upper-case lump or texture name.
///
/// Every constructor guarantees the bytes are printable ASCII followed by nulls, so names compare
/// case-insensitively and always convert to `&str`.
#[derive(Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Default)]
pub struct WadName([u8; 8]);

impl WadName {
    pub fn push(&mut self, new_byte: u8) -> Result<()> {
        let new_byte = match new_byte.to_ascii_uppercase() {
            b if b.is_ascii_graphic() => b,
            b => {
                bail!(ErrorKind::invalid_byte_in_wad_name(b, &self.0));
            }
        };

        for byte in &mut self.0 {
            if *byte == 0 {
                *byte = new_byte;
                return Ok(());
            }
        }

        bail!(ErrorKind::wad_name_too_long(&self.0));
    }

    pub fn from_bytes(value: &[u8]) -> Result<WadName> {
        let mut name = [0u8; 8];
        let mut nulled = false;
        for (dest, &src) in name.iter_mut().zip(value.iter()) {
            let new_byte = match src.to_ascii_uppercase() {
                b if b.is_ascii_graphic() => b,
                b'\0' => {
                    nulled = true;
                    break;
                }
                b => {
                    bail!(ErrorKind::invalid_byte_in_wad_name(b, value));
                }
            };
            *dest = new_byte;
        }

        ensure!(
            nulled || value.len() <= 8,
            ErrorKind::wad_name_too_long(value)
        );
        Ok(WadName(name))
    }

    /// Like `from_bytes`, but never fails: bytes that cannot appear in a name become `_` and
    /// anything after the eighth byte is dropped.
    pub fn from_bytes_lossy(value: &[u8]) -> WadName {
        let mut name = [0u8; 8];
        for (dest, &src) in name.iter_mut().zip(value.iter()) {
            *dest = match src.to_ascii_uppercase() {
                b'\0' => break,
                b if b.is_ascii_graphic() => b,
                _ => b'_',
            };
        }
        WadName(name)
    }

    /// The name without its null padding.
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&byte| byte == 0).unwrap_or(8);
        str::from_utf8(&self.0[..len]).expect("wad name is not valid utf-8")
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Case-insensitive substring test.
    pub fn contains(&self, needle: &str) -> bool {
        self.as_str().contains(needle.to_ascii_uppercase().as_str())
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix.to_ascii_uppercase().as_str())
    }
}

impl FromStr for WadName {
    type Err = super::errors::Error;
    fn from_str(value: &str) -> Result<WadName> {
        WadName::from_bytes(value.as_bytes())
    }
}

impl Display for WadName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl Deref for WadName {
    type Target = [u8; 8];
    fn deref(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Debug for WadName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "WadName({:?})", self.as_str())
    }
}

impl PartialEq<[u8; 8]> for WadName {
    fn eq(&self, rhs: &[u8; 8]) -> bool {
        self.deref() == rhs
    }
}

impl Borrow<[u8; 8]> for WadName {
    fn borrow(&self) -> &[u8; 8] {
        self.deref()
    }
}

impl AsRef<str> for WadName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for WadName {
    fn deserialize<D>(deserializer: D) -> StdResult<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[u8; 8]>::deserialize(deserializer).map(|bytes| WadName::from_bytes_lossy(&bytes))
    }
}

pub trait IntoWadName {
    fn into_wad_name(self) -> Result<WadName>;
}

impl IntoWadName for &[u8] {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_bytes(self)
    }
}

impl IntoWadName for &[u8; 8] {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_bytes(self)
    }
}

impl IntoWadName for &str {
    fn into_wad_name(self) -> Result<WadName> {
        WadName::from_str(self)
    }
}

impl IntoWadName for WadName {
    fn into_wad_name(self) -> Result<WadName> {
        Ok(self)
    }
}

impl IntoWadName for &WadName {
    fn into_wad_name(self) -> Result<WadName> {
        Ok(*self)
    }
}
