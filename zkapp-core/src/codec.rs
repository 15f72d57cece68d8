//! Bidirectional encodings between in-memory values and wire forms
//!
//! A [`Codec`] is a record of function pointers built once per type and
//! passed explicitly to whatever needs to hash or serialize values of that
//! type (committed lists, state layouts). Types opt in through
//! [`FieldCodec`].

use crate::types::{Field, PublicKey};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Packing of a value into a fixed number of field elements
pub trait FieldCodec: Sized {
    /// Number of fields produced by [`FieldCodec::to_fields`]
    fn size_in_fields() -> usize;

    /// Pack into fields
    fn to_fields(&self) -> Vec<Field>;

    /// Unpack from exactly [`FieldCodec::size_in_fields`] fields
    fn from_fields(fields: &[Field]) -> Result<Self>;
}

fn expect_len(fields: &[Field], n: usize) -> Result<()> {
    if fields.len() != n {
        return Err(Error::Codec(format!(
            "expected {} fields, got {}",
            n,
            fields.len()
        )));
    }
    Ok(())
}

impl FieldCodec for Field {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![*self]
    }

    fn from_fields(fields: &[Field]) -> Result<Self> {
        expect_len(fields, 1)?;
        Ok(fields[0])
    }
}

impl FieldCodec for u64 {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![Field::from_u64(*self)]
    }

    fn from_fields(fields: &[Field]) -> Result<Self> {
        expect_len(fields, 1)?;
        fields[0]
            .to_u64()
            .ok_or_else(|| Error::Codec(format!("{} does not fit in u64", fields[0])))
    }
}

impl FieldCodec for u32 {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![Field::from_u64(*self as u64)]
    }

    fn from_fields(fields: &[Field]) -> Result<Self> {
        let wide = u64::from_fields(fields)?;
        u32::try_from(wide).map_err(|_| Error::Codec(format!("{} does not fit in u32", wide)))
    }
}

impl FieldCodec for bool {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![Field::from_bool(*self)]
    }

    fn from_fields(fields: &[Field]) -> Result<Self> {
        expect_len(fields, 1)?;
        fields[0]
            .to_bool()
            .ok_or_else(|| Error::Codec(format!("{} is not a boolean", fields[0])))
    }
}

impl FieldCodec for PublicKey {
    fn size_in_fields() -> usize {
        1
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![self.to_field()]
    }

    fn from_fields(fields: &[Field]) -> Result<Self> {
        expect_len(fields, 1)?;
        Ok(PublicKey::from_bytes(*fields[0].as_bytes()))
    }
}

/// Explicit encoding record for `T`
pub struct Codec<T> {
    /// Number of fields per value, `None` for variable-length encodings
    pub size_in_fields: Option<usize>,
    /// Pack into fields
    pub to_fields: fn(&T) -> Vec<Field>,
    /// Unpack from fields
    pub from_fields: fn(&[Field]) -> Result<T>,
    /// Encode as JSON
    pub to_json: fn(&T) -> Result<serde_json::Value>,
    /// Decode from JSON
    pub from_json: fn(serde_json::Value) -> Result<T>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Codec<T> {}

impl<T> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("type", &std::any::type_name::<T>())
            .field("size_in_fields", &self.size_in_fields)
            .finish()
    }
}

fn json_encode<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn json_decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

impl<T: FieldCodec + Serialize + DeserializeOwned> Codec<T> {
    /// Codec derived from the type's [`FieldCodec`] and serde impls
    pub fn derived() -> Self {
        Codec {
            size_in_fields: Some(T::size_in_fields()),
            to_fields: T::to_fields,
            from_fields: T::from_fields,
            to_json: json_encode::<T>,
            from_json: json_decode::<T>,
        }
    }
}

impl Codec<Vec<Field>> {
    /// Variable-length raw field arrays, the generic event/action form
    pub fn raw_fields() -> Self {
        Codec {
            size_in_fields: None,
            to_fields: |fields| fields.clone(),
            from_fields: |fields| Ok(fields.to_vec()),
            to_json: json_encode::<Vec<Field>>,
            from_json: json_decode::<Vec<Field>>,
        }
    }
}

impl<T> Codec<T> {
    /// Pack a value
    pub fn encode(&self, value: &T) -> Vec<Field> {
        (self.to_fields)(value)
    }

    /// Unpack a value, checking the declared width
    pub fn decode(&self, fields: &[Field]) -> Result<T> {
        if let Some(n) = self.size_in_fields {
            expect_len(fields, n)?;
        }
        (self.from_fields)(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_codec_fields() {
        let codec = Codec::<u64>::derived();
        let fields = codec.encode(&77);
        assert_eq!(fields, vec![Field::from_u64(77)]);
        assert_eq!(codec.decode(&fields).unwrap(), 77);
        assert!(codec.decode(&[]).is_err());
    }

    #[test]
    fn test_derived_codec_json() {
        let codec = Codec::<bool>::derived();
        let json = (codec.to_json)(&true).unwrap();
        assert_eq!(json, serde_json::Value::Bool(true));
        assert!((codec.from_json)(json).unwrap());
    }

    #[test]
    fn test_u32_out_of_range() {
        let fields = vec![Field::from_u64(u64::from(u32::MAX) + 1)];
        assert!(u32::from_fields(&fields).is_err());
    }

    #[test]
    fn test_raw_fields_codec() {
        let codec = Codec::raw_fields();
        let item = vec![Field::from_u64(1), Field::from_u64(2), Field::from_u64(3)];
        assert_eq!(codec.decode(&codec.encode(&item)).unwrap(), item);
    }
}
