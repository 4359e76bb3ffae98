//! Compile-time inputs of a stencil: externals and the field type signature.
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use strata_frontend::{DataType, Literal};
use strata_utils::Id;

/// Values of externals, sorted by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Externals {
    values: BTreeMap<Id, Literal>,
}

impl Externals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insertion.
    pub fn with<S: Into<Id>, L: Into<Literal>>(mut self, name: S, value: L) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<S: Into<Id>, L: Into<Literal>>(&mut self, name: S, value: L) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &Id) -> Option<&Literal> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in `other` replace values in `self`.
    pub fn merged(&self, other: &Externals) -> Externals {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(k, v)| (*k, *v)));
        Externals { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Literal)> {
        self.values.iter()
    }
}

impl FromIterator<(Id, Literal)> for Externals {
    fn from_iter<T: IntoIterator<Item = (Id, Literal)>>(iter: T) -> Self {
        Externals {
            values: iter.into_iter().collect(),
        }
    }
}

impl Display for Externals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.values.iter().map(|(k, v)| format!("{k}={v}")).join(",")
        )
    }
}

/// Element type overrides for fields and scalars, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeSignature {
    types: BTreeMap<Id, DataType>,
}

impl TypeSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<Id>>(mut self, name: S, dtype: DataType) -> Self {
        self.types.insert(name.into(), dtype);
        self
    }

    pub fn insert<S: Into<Id>>(&mut self, name: S, dtype: DataType) {
        self.types.insert(name.into(), dtype);
    }

    pub fn get(&self, name: &Id) -> Option<DataType> {
        self.types.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &DataType)> {
        self.types.iter()
    }
}

impl Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.types.iter().map(|(k, v)| format!("{k}:{v}")).join(",")
        )
    }
}
