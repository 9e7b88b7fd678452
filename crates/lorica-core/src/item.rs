//! Probe item model.
//!
//! The cache treats items as opaque: it only needs a content fingerprint, a
//! structural equality check, and a writable stamp slot. [`ProbeItem`]
//! captures exactly that surface. [`Record`] is the concrete item type used
//! by record-producing probes (file records, package tuples and the like).

use serde::{Deserialize, Serialize};

use crate::fingerprint;

/// An item the collection cache can deduplicate and stamp.
///
/// `fingerprint` and `content_eq` must agree: items that compare equal must
/// produce the same fingerprint, and neither may depend on the stamp slot.
/// Fingerprint collisions between unequal items are fine.
pub trait ProbeItem: Send + Sync + 'static {
    /// 64-bit content digest. Pure function of item content.
    fn fingerprint(&self) -> u64;

    /// Structural equality, ignoring the stamp slot.
    fn content_eq(&self, other: &Self) -> bool;

    /// Overwrite the stamp slot with a freshly minted unique ID.
    fn set_stamp(&mut self, stamp: String);

    /// Read the stamp slot.
    fn stamp(&self) -> Option<&str>;
}

/// A single typed field value in a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A named record with ordered, typed fields and a stamp slot.
///
/// This is the shape most probes emit: a record name identifying the kind of
/// observation, plus the observed fields. Two records are structural
/// duplicates when name and fields match; the stamp never participates in
/// identity.
///
/// # Example
///
/// ```
/// use lorica_core::{ProbeItem, Record};
///
/// let a = Record::new("file_item").with_field("path", "/etc/passwd");
/// let b = Record::new("file_item").with_field("path", "/etc/passwd");
///
/// assert!(a.content_eq(&b));
/// assert_eq!(a.fingerprint(), b.fingerprint());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Record name, e.g. `"rpminfo_item"`.
    pub name: String,
    /// Ordered fields. Field order participates in identity.
    pub fields: Vec<(String, FieldValue)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stamp: Option<String>,
}

impl Record {
    /// Create a record with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            stamp: None,
        }
    }

    /// Append a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Canonical byte encoding of name and fields, stamp excluded.
    ///
    /// Length-prefixed so that field boundaries cannot alias
    /// (`("ab", "c")` never encodes like `("a", "bc")`).
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.name.len());
        buf.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());

        for (key, value) in &self.fields {
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key.as_bytes());
            match value {
                FieldValue::Str(s) => {
                    buf.push(0);
                    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    buf.extend_from_slice(s.as_bytes());
                }
                FieldValue::Int(i) => {
                    buf.push(1);
                    buf.extend_from_slice(&i.to_le_bytes());
                }
                FieldValue::Bool(b) => {
                    buf.push(2);
                    buf.push(u8::from(*b));
                }
            }
        }

        buf
    }
}

impl ProbeItem for Record {
    fn fingerprint(&self) -> u64 {
        fingerprint::digest(&self.canonical_bytes())
    }

    fn content_eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }

    fn set_stamp(&mut self, stamp: String) {
        self.stamp = Some(stamp);
    }

    fn stamp(&self) -> Option<&str> {
        self.stamp.as_deref()
    }
}
