//! Validated identifier value types.
//!
//! Each identifier wraps a single string that is checked once at construction
//! and never changes afterwards. Equality and hashing are by value.
//!
//! | Type               | Rule                                   |
//! |--------------------|----------------------------------------|
//! | `HealthCardId`     | exactly 16 ASCII alphanumeric chars    |
//! | `PrescriptionCode` | exactly 16 ASCII alphanumeric chars    |
//! | `ProductId`        | 12 to 16 ASCII alphanumeric chars      |

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const CARD_ID_LEN: usize = 16;
const PRESCRIPTION_CODE_LEN: usize = 16;
const PRODUCT_ID_MIN_LEN: usize = 12;
const PRODUCT_ID_MAX_LEN: usize = 16;

fn validate_code(kind: &str, code: &str, min_len: usize, max_len: usize) -> Result<()> {
    if code.is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", kind)));
    }

    let len = code.chars().count();
    if len < min_len || len > max_len {
        let expected = if min_len == max_len {
            format!("exactly {}", min_len)
        } else {
            format!("{} to {}", min_len, max_len)
        };
        return Err(Error::Validation(format!(
            "{} must have {} characters, got {}",
            kind, expected, len
        )));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!(
            "{} must be alphanumeric: '{}'",
            kind, code
        )));
    }

    Ok(())
}

// ============================================================================
// Patient card
// ============================================================================

/// Personal identifying code of a patient in the national health service
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HealthCardId(String);

impl HealthCardId {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        validate_code("Health card ID", &code, CARD_ID_LEN, CARD_ID_LEN)?;
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HealthCardId {
    type Error = Error;

    fn try_from(code: String) -> Result<Self> {
        Self::new(code)
    }
}

impl From<HealthCardId> for String {
    fn from(id: HealthCardId) -> Self {
        id.0
    }
}

impl fmt::Display for HealthCardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Product
// ============================================================================

/// Universal product code of a medicine
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        validate_code("Product ID", &code, PRODUCT_ID_MIN_LEN, PRODUCT_ID_MAX_LEN)?;
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = Error;

    fn try_from(code: String) -> Result<Self> {
        Self::new(code)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Prescription code
// ============================================================================

/// Code the registry issues to a prescription once it is accepted
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrescriptionCode(String);

impl PrescriptionCode {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        validate_code(
            "Prescription code",
            &code,
            PRESCRIPTION_CODE_LEN,
            PRESCRIPTION_CODE_LEN,
        )?;
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PrescriptionCode {
    type Error = Error;

    fn try_from(code: String) -> Result<Self> {
        Self::new(code)
    }
}

impl From<PrescriptionCode> for String {
    fn from(code: PrescriptionCode) -> Self {
        code.0
    }
}

impl fmt::Display for PrescriptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Signature
// ============================================================================

/// Opaque digital signature of the prescribing doctor
///
/// The bytes are copied in on construction and copied out by `to_bytes`,
/// so the stored blob never shares a buffer with a caller.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DigitalSignature(Vec<u8>);

impl DigitalSignature {
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Validation("Digital signature cannot be empty".into()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigitalSignature({} bytes)", self.0.len())
    }
}
