//! Named, typed arguments passed to contract entry points and install code.
use super::cl_value::{CLTyped, CLValue};
use crate::common::{invalid_data, io, BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Argument `{name}` is already present.")]
    DuplicateArgument { name: String },
}

/// A single named argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, CLValue)", into = "(String, CLValue)")]
pub struct NamedArg {
    name:  String,
    value: CLValue,
}

impl NamedArg {
    pub fn name(&self) -> &str { &self.name }

    pub fn value(&self) -> &CLValue { &self.value }
}

impl From<(String, CLValue)> for NamedArg {
    fn from((name, value): (String, CLValue)) -> Self { Self { name, value } }
}

impl From<NamedArg> for (String, CLValue) {
    fn from(arg: NamedArg) -> Self { (arg.name, arg.value) }
}

/// An ordered set of uniquely named arguments.
///
/// Arguments keep the order in which they were inserted. Since the order is
/// part of the serialization, and hence of the deploy hash, two sets with the
/// same arguments in a different order are different sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeArgs {
    args: Vec<NamedArg>,
}

impl RuntimeArgs {
    pub fn new() -> Self { Self::default() }

    /// Insert a typed value. Fails, leaving the set unchanged, if an argument
    /// with the same name already exists.
    pub fn insert<T: CLTyped + BorshSerialize>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), ArgumentError> {
        self.insert_cl_value(name, CLValue::from_t(&value))
    }

    /// Insert an already encoded value. Same uniqueness rules as
    /// [`insert`](Self::insert).
    pub fn insert_cl_value(
        &mut self,
        name: impl Into<String>,
        value: CLValue,
    ) -> Result<(), ArgumentError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(ArgumentError::DuplicateArgument { name });
        }
        self.args.push(NamedArg { name, value });
        Ok(())
    }

    /// Insert the value if one is given, and do nothing otherwise. Used to
    /// build sparse argument sets for partial updates.
    pub fn insert_if_some<T: CLTyped + BorshSerialize>(
        &mut self,
        name: impl Into<String>,
        value: Option<T>,
    ) -> Result<(), ArgumentError> {
        match value {
            Some(value) => self.insert(name, value),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CLValue> {
        self.args.iter().find(|arg| arg.name == name).map(|arg| &arg.value)
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    pub fn len(&self) -> usize { self.args.len() }

    pub fn is_empty(&self) -> bool { self.args.is_empty() }

    /// Argument names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> { self.args.iter().map(|arg| arg.name()) }

    pub fn iter(&self) -> impl Iterator<Item = &NamedArg> { self.args.iter() }
}

impl BorshSerialize for NamedArg {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.name, writer)?;
        BorshSerialize::serialize(&self.value, writer)
    }
}

impl BorshDeserialize for NamedArg {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let name = String::deserialize_reader(reader)?;
        let value = CLValue::deserialize_reader(reader)?;
        Ok(Self { name, value })
    }
}

impl BorshSerialize for RuntimeArgs {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.args, writer)
    }
}

impl BorshDeserialize for RuntimeArgs {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let args = Vec::<NamedArg>::deserialize_reader(reader)?;
        let mut out = RuntimeArgs::new();
        for arg in args {
            out.insert_cl_value(arg.name, arg.value).map_err(invalid_data)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common,
        types::{CLType, U256},
    };

    #[test]
    fn test_duplicate_leaves_set_unchanged() {
        let mut args = RuntimeArgs::new();
        args.insert("count", 3u64).expect("First insert");
        let before = args.clone();
        let err = args.insert("count", true).expect_err("Duplicate name");
        assert_eq!(err, ArgumentError::DuplicateArgument {
            name: "count".into(),
        });
        assert_eq!(args, before);
        assert_eq!(args.get("count").map(|v| v.cl_type()), Some(&CLType::U64));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut args = RuntimeArgs::new();
        args.insert("b", 1u8).expect("Insert");
        args.insert("a", U256::from(2)).expect("Insert");
        args.insert_if_some::<bool>("skipped", None).expect("Insert");
        args.insert_if_some("c", Some(false)).expect("Insert");
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_layout_and_json() {
        let mut args = RuntimeArgs::new();
        args.insert("x", 1u8).expect("Insert");
        let bytes = common::to_bytes(&args);
        // Count, name, value blob, value, type tag.
        assert_eq!(bytes, vec![1, 0, 0, 0, 1, 0, 0, 0, b'x', 1, 0, 0, 0, 1, 3]);
        assert_eq!(common::from_bytes::<RuntimeArgs>(&bytes).expect("Valid args"), args);

        let json = serde_json::to_value(&args).expect("Serializable");
        assert_eq!(
            json,
            serde_json::json!([["x", {"cl_type": "U8", "bytes": "01", "parsed": null}]])
        );
    }

    #[test]
    fn test_duplicate_rejected_when_parsing() {
        let mut bytes = vec![2, 0, 0, 0];
        for _ in 0..2 {
            bytes.extend([1, 0, 0, 0, b'x', 1, 0, 0, 0, 1, 3]);
        }
        assert!(common::from_bytes::<RuntimeArgs>(&bytes).is_err());
    }
}
