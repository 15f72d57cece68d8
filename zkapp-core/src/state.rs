//! zkApp state layouts
//!
//! Accounts always store state as a fixed array of field elements. A
//! [`StateLayout`] gives that array a typed, named view. Custom layouts are
//! an explicit ordered list of `(name, type)` pairs; field order in the
//! generic array follows list order.

use crate::account_update::Update;
use crate::codec::FieldCodec;
use crate::precondition::Equals;
use crate::types::{Field, PublicKey, MAX_ZKAPP_STATE_FIELDS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Type of one named state entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateValueType {
    /// Raw field element
    Field,
    /// Unsigned 64-bit integer
    U64,
    /// Unsigned 32-bit integer
    U32,
    /// Boolean
    Bool,
    /// Public key
    PublicKey,
}

impl StateValueType {
    /// Width in field elements
    pub fn size_in_fields(&self) -> usize {
        match self {
            StateValueType::Field => Field::size_in_fields(),
            StateValueType::U64 => u64::size_in_fields(),
            StateValueType::U32 => u32::size_in_fields(),
            StateValueType::Bool => bool::size_in_fields(),
            StateValueType::PublicKey => PublicKey::size_in_fields(),
        }
    }

    fn decode(&self, fields: &[Field]) -> Result<StateValue> {
        Ok(match self {
            StateValueType::Field => StateValue::Field(Field::from_fields(fields)?),
            StateValueType::U64 => StateValue::U64(u64::from_fields(fields)?),
            StateValueType::U32 => StateValue::U32(u32::from_fields(fields)?),
            StateValueType::Bool => StateValue::Bool(bool::from_fields(fields)?),
            StateValueType::PublicKey => StateValue::PublicKey(PublicKey::from_fields(fields)?),
        })
    }
}

/// Typed state value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateValue {
    /// Raw field element
    Field(Field),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Boolean
    Bool(bool),
    /// Public key
    PublicKey(PublicKey),
}

impl StateValue {
    /// Type tag
    pub fn value_type(&self) -> StateValueType {
        match self {
            StateValue::Field(_) => StateValueType::Field,
            StateValue::U64(_) => StateValueType::U64,
            StateValue::U32(_) => StateValueType::U32,
            StateValue::Bool(_) => StateValueType::Bool,
            StateValue::PublicKey(_) => StateValueType::PublicKey,
        }
    }

    fn encode(&self) -> Vec<Field> {
        match self {
            StateValue::Field(v) => v.to_fields(),
            StateValue::U64(v) => v.to_fields(),
            StateValue::U32(v) => v.to_fields(),
            StateValue::Bool(v) => v.to_fields(),
            StateValue::PublicKey(v) => v.to_fields(),
        }
    }

    fn zero(value_type: StateValueType) -> Self {
        match value_type {
            StateValueType::Field => StateValue::Field(Field::ZERO),
            StateValueType::U64 => StateValue::U64(0),
            StateValueType::U32 => StateValue::U32(0),
            StateValueType::Bool => StateValue::Bool(false),
            StateValueType::PublicKey => StateValue::PublicKey(PublicKey::empty()),
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Field(v) => write!(f, "{}", v),
            StateValue::U64(v) => write!(f, "{}", v),
            StateValue::U32(v) => write!(f, "{}", v),
            StateValue::Bool(v) => write!(f, "{}", v),
            StateValue::PublicKey(v) => write!(f, "{}", v),
        }
    }
}

/// Generic state array
pub type GenericState = [Field; MAX_ZKAPP_STATE_FIELDS];

/// Ordered named entries that fit in the generic state array
///
/// Only constructed through validation, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<(String, StateValueType)>",
    into = "Vec<(String, StateValueType)>"
)]
pub struct CustomLayout(Vec<(String, StateValueType)>);

impl CustomLayout {
    /// Entries in generic-array order
    pub fn entries(&self) -> &[(String, StateValueType)] {
        &self.0
    }
}

impl TryFrom<Vec<(String, StateValueType)>> for CustomLayout {
    type Error = Error;

    fn try_from(entries: Vec<(String, StateValueType)>) -> Result<Self> {
        let width: usize = entries.iter().map(|(_, t)| t.size_in_fields()).sum();
        if width > MAX_ZKAPP_STATE_FIELDS {
            return Err(Error::InvalidInput(format!(
                "state layout needs {} fields, at most {} available",
                width, MAX_ZKAPP_STATE_FIELDS
            )));
        }
        let mut names = BTreeSet::new();
        for (name, _) in &entries {
            if !names.insert(name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate state field name: {}",
                    name
                )));
            }
        }
        Ok(CustomLayout(entries))
    }
}

impl From<CustomLayout> for Vec<(String, StateValueType)> {
    fn from(layout: CustomLayout) -> Self {
        layout.0
    }
}

/// Shape of an account's state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StateLayout {
    /// Eight raw field elements
    #[default]
    Generic,
    /// Ordered named entries
    Custom(CustomLayout),
}

impl StateLayout {
    /// Validated custom layout
    pub fn custom(entries: Vec<(String, StateValueType)>) -> Result<Self> {
        Ok(StateLayout::Custom(CustomLayout::try_from(entries)?))
    }

    /// Entry types in order
    pub fn types(&self) -> Vec<StateValueType> {
        match self {
            StateLayout::Generic => vec![StateValueType::Field; MAX_ZKAPP_STATE_FIELDS],
            StateLayout::Custom(layout) => layout.entries().iter().map(|(_, t)| *t).collect(),
        }
    }

    /// Position of a named entry (custom layouts only)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        match self {
            StateLayout::Generic => None,
            StateLayout::Custom(layout) => layout.entries().iter().position(|(n, _)| n == name),
        }
    }

    /// All-zero values for this layout
    pub fn empty_values(&self) -> Vec<StateValue> {
        self.types().into_iter().map(StateValue::zero).collect()
    }

    /// Generic state array holding `values`
    pub fn values_to_generic(&self, values: &[StateValue]) -> Result<GenericState> {
        let types = self.types();
        if values.len() != types.len() {
            return Err(Error::Codec(format!(
                "expected {} state values, got {}",
                types.len(),
                values.len()
            )));
        }

        let mut out = [Field::ZERO; MAX_ZKAPP_STATE_FIELDS];
        let mut offset = 0;
        for (value, expected) in values.iter().zip(types) {
            if value.value_type() != expected {
                return Err(Error::Codec(format!(
                    "state value {} is not of type {:?}",
                    value, expected
                )));
            }
            for field in value.encode() {
                *slot_mut(&mut out, offset)? = field;
                offset += 1;
            }
        }
        Ok(out)
    }

    /// Typed values read back from a generic state array
    pub fn values_from_generic(&self, state: &GenericState) -> Result<Vec<StateValue>> {
        let mut offset = 0;
        let mut values = Vec::new();
        for value_type in self.types() {
            let width = value_type.size_in_fields();
            values.push(value_type.decode(window(state, offset, width)?)?);
            offset += width;
        }
        Ok(values)
    }

    /// Generic per-field updates for typed updates
    pub fn updates_to_generic(
        &self,
        updates: &[Update<StateValue>],
    ) -> Result<[Update<Field>; MAX_ZKAPP_STATE_FIELDS]> {
        let values: Vec<StateValue> = updates.iter().map(|u| u.value).collect();
        let packed = self.values_to_generic(&values)?;
        let mut out: [Update<Field>; MAX_ZKAPP_STATE_FIELDS] = Default::default();
        let mut offset = 0;
        for update in updates {
            for _ in 0..update.value.value_type().size_in_fields() {
                let slot = slot_mut(&mut out, offset)?;
                *slot = Update {
                    set: update.set,
                    value: packed[offset],
                };
                offset += 1;
            }
        }
        Ok(out)
    }

    /// Typed updates read back from generic per-field updates
    ///
    /// A multi-field entry counts as set only when all of its fields are set.
    pub fn updates_from_generic(
        &self,
        updates: &[Update<Field>; MAX_ZKAPP_STATE_FIELDS],
    ) -> Result<Vec<Update<StateValue>>> {
        let mut offset = 0;
        let mut out = Vec::new();
        for value_type in self.types() {
            let width = value_type.size_in_fields();
            let slice = window(updates, offset, width)?;
            let fields: Vec<Field> = slice.iter().map(|u| u.value).collect();
            out.push(Update {
                set: slice.iter().all(|u| u.set),
                value: value_type.decode(&fields)?,
            });
            offset += width;
        }
        Ok(out)
    }

    /// Generic per-field guards for typed guards
    pub fn preconditions_to_generic(
        &self,
        guards: &[Equals<StateValue>],
    ) -> Result<[Equals<Field>; MAX_ZKAPP_STATE_FIELDS]> {
        let types = self.types();
        if guards.len() != types.len() {
            return Err(Error::Codec(format!(
                "expected {} state preconditions, got {}",
                types.len(),
                guards.len()
            )));
        }

        let mut out: [Equals<Field>; MAX_ZKAPP_STATE_FIELDS] = Default::default();
        let mut offset = 0;
        for (guard, value_type) in guards.iter().zip(types) {
            match guard {
                Equals::Disabled => offset += value_type.size_in_fields(),
                Equals::Enabled(value) => {
                    if value.value_type() != value_type {
                        return Err(Error::Codec(format!(
                            "state precondition {} is not of type {:?}",
                            value, value_type
                        )));
                    }
                    for field in value.encode() {
                        *slot_mut(&mut out, offset)? = Equals::Enabled(field);
                        offset += 1;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Typed guards read back from generic per-field guards
    pub fn preconditions_from_generic(
        &self,
        guards: &[Equals<Field>; MAX_ZKAPP_STATE_FIELDS],
    ) -> Result<Vec<Equals<StateValue>>> {
        let mut offset = 0;
        let mut out = Vec::new();
        for value_type in self.types() {
            let width = value_type.size_in_fields();
            let slice = window(guards, offset, width)?;
            let values: Option<Vec<Field>> = slice
                .iter()
                .map(|g| match g {
                    Equals::Enabled(v) => Some(*v),
                    Equals::Disabled => None,
                })
                .collect();
            out.push(match values {
                Some(fields) => Equals::Enabled(value_type.decode(&fields)?),
                None => Equals::Disabled,
            });
            offset += width;
        }
        Ok(out)
    }
}

fn window<T>(items: &[T], offset: usize, width: usize) -> Result<&[T]> {
    items
        .get(offset..offset + width)
        .ok_or_else(|| Error::Codec(format!("state layout overruns {} fields", items.len())))
}

fn slot_mut<T>(items: &mut [T], offset: usize) -> Result<&mut T> {
    let len = items.len();
    items
        .get_mut(offset)
        .ok_or_else(|| Error::Codec(format!("state layout overruns {} fields", len)))
}
