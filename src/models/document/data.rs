use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Raw bytes that serialize as a plist `<data>` element.
///
/// A plain `Vec<u8>` would serialize as an array of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PlistData(pub Vec<u8>);

impl PlistData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Little-endian encoding of a 32-bit value, as used by `layout-id`
    /// and `AAPL,ig-platform-id`.
    pub fn from_u32_le(value: u32) -> Self {
        Self(value.to_le_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for PlistData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<PlistData> for plist::Value {
    fn from(data: PlistData) -> Self {
        plist::Value::Data(data.0)
    }
}

impl Serialize for PlistData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlistData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_byte_buf(PlistDataVisitor)
    }
}

struct PlistDataVisitor;

impl<'de> Visitor<'de> for PlistDataVisitor {
    type Value = PlistData;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("plist data")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(PlistData(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(PlistData(v))
    }

    // Formats without a native bytes type hand the data over as a sequence.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(PlistData(bytes))
    }
}
