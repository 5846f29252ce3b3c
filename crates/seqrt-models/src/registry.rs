//! Named variable index with alias resolution

use crate::storage::{StorageData, Variable};
use half::f16;
use seqrt_common::{ModelError, Result, SeqrtError};
use std::collections::{HashMap, HashSet};

/// Scalar types an attribute (single-element variable) can be read as.
///
/// The stored dtype must match exactly; there is no implicit conversion.
pub trait AttributeValue: Sized {
    const TYPE_NAME: &'static str;

    fn from_storage(data: &StorageData) -> Option<Self>;
}

macro_rules! impl_attribute_value {
    ($($t:ty => $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl AttributeValue for $t {
                const TYPE_NAME: &'static str = $name;

                fn from_storage(data: &StorageData) -> Option<Self> {
                    match data {
                        StorageData::$variant(v) => v.first().copied(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_attribute_value! {
    f32 => F32, "float32";
    f16 => F16, "float16";
    i8 => I8, "int8";
    i16 => I16, "int16";
    i32 => I32, "int32";
}

/// Staged registry edit produced by a conversion pass.
///
/// Every replacement is built before anything is applied, so a failing pass
/// leaves the registry untouched.
#[derive(Debug, Default)]
pub(crate) struct ConversionPlan {
    pub(crate) to_add: Vec<(String, Variable)>,
    pub(crate) to_remove: Vec<String>,
}

impl ConversionPlan {
    pub(crate) fn add(&mut self, name: impl Into<String>, variable: Variable) {
        self.to_add.push((name.into(), variable));
    }

    pub(crate) fn remove(&mut self, name: impl Into<String>) {
        self.to_remove.push(name.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Variables of a model, indexed by name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    variables: HashMap<String, Variable>,
    aliases: HashMap<String, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks `name` up, following one alias hop. An alias shadows a variable
    /// of the same name.
    pub fn get_variable_if_exists(&self, name: &str) -> Option<&Variable> {
        match self.aliases.get(name) {
            Some(target) => self.variables.get(target),
            None => self.variables.get(name),
        }
    }

    /// Canonical name `name` refers to.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    pub fn get_variable(&self, name: &str) -> Result<&Variable> {
        self.get_variable_if_exists(name).ok_or_else(|| SeqrtError::missing_variable(name))
    }

    /// Reads a single-element variable as `T`, or returns `default` when the
    /// variable does not exist.
    pub fn get_attribute_with_default<T: AttributeValue>(&self, name: &str, default: T) -> Result<T> {
        let Some(variable) = self.get_variable_if_exists(name) else {
            return Ok(default);
        };
        if variable.numel() != 1 {
            return Err(ModelError::AttributeType {
                name: name.to_string(),
                expected: T::TYPE_NAME,
                found: format!("{} with {} elements", variable.dtype(), variable.numel()),
            }
            .into());
        }
        T::from_storage(variable.data()).ok_or_else(|| {
            ModelError::AttributeType {
                name: name.to_string(),
                expected: T::TYPE_NAME,
                found: variable.dtype().to_string(),
            }
            .into()
        })
    }

    /// Reads a flag: any single-element integer variable, non-zero is `true`.
    pub fn get_flag_with_default(&self, name: &str, default: bool) -> Result<bool> {
        let Some(variable) = self.get_variable_if_exists(name) else {
            return Ok(default);
        };
        let value = match variable.data() {
            StorageData::I8(v) if v.len() == 1 => i32::from(v[0]),
            StorageData::I16(v) if v.len() == 1 => i32::from(v[0]),
            StorageData::I32(v) if v.len() == 1 => v[0],
            _ => {
                return Err(ModelError::AttributeType {
                    name: name.to_string(),
                    expected: "integer flag",
                    found: format!("{} with {} elements", variable.dtype(), variable.numel()),
                }
                .into());
            }
        };
        Ok(value != 0)
    }

    /// True when `name` resolves to a variable.
    pub fn contains(&self, name: &str) -> bool {
        self.get_variable_if_exists(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(name, variable)| (name.as_str(), variable))
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(alias, target)| (alias.as_str(), target.as_str()))
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, variable: Variable) -> Option<Variable> {
        self.variables.insert(name.into(), variable)
    }

    pub(crate) fn register_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub(crate) fn variables_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.variables.values_mut()
    }

    /// Applies a staged edit: additions replace same-named variables, then
    /// removals drop names that were not re-added.
    pub(crate) fn apply(&mut self, plan: ConversionPlan) {
        let added: HashSet<String> = plan.to_add.iter().map(|(name, _)| name.clone()).collect();
        for (name, variable) in plan.to_add {
            self.variables.insert(name, variable);
        }
        for name in plan.to_remove {
            if !added.contains(&name) {
                self.variables.remove(&name);
            }
        }
    }
}
