use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A buildable component of a package.
///
/// Renders as `lib`, `exe:<name>`, `test:<name>`, `bench:<name>` or `setup`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComponentName {
    Lib,
    Exe(String),
    Test(String),
    Bench(String),
    /// Dependencies of the package's custom setup script.
    Setup,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid component name '{text}'")]
pub struct ComponentNameError {
    pub text: String,
}

impl FromStr for ComponentName {
    type Err = ComponentNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ComponentNameError {
            text: s.to_string(),
        };
        match s {
            "lib" => return Ok(ComponentName::Lib),
            "setup" => return Ok(ComponentName::Setup),
            _ => {}
        }
        let (kind, name) = s.split_once(':').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let name = name.to_string();
        match kind {
            "exe" => Ok(ComponentName::Exe(name)),
            "test" => Ok(ComponentName::Test(name)),
            "bench" => Ok(ComponentName::Bench(name)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for ComponentName {
    type Error = ComponentNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentName> for String {
    fn from(value: ComponentName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentName::Lib => f.write_str("lib"),
            ComponentName::Exe(n) => write!(f, "exe:{n}"),
            ComponentName::Test(n) => write!(f, "test:{n}"),
            ComponentName::Bench(n) => write!(f, "bench:{n}"),
            ComponentName::Setup => f.write_str("setup"),
        }
    }
}

/// Per-component dependency lists, ordered by component.
///
/// Within one component the order of the list is preserved as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentDeps<T>(BTreeMap<ComponentName, Vec<T>>);

impl<T> Default for ComponentDeps<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> ComponentDeps<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// All dependencies attributed to the library component.
    pub fn from_lib(deps: Vec<T>) -> Self {
        let mut out = Self::new();
        out.insert(ComponentName::Lib, deps);
        out
    }

    /// Replaces the list for `component`, returning the previous one.
    pub fn insert(&mut self, component: ComponentName, deps: Vec<T>) -> Option<Vec<T>> {
        self.0.insert(component, deps)
    }

    /// Appends to the list for `component`, creating it if needed.
    pub fn extend(&mut self, component: ComponentName, deps: impl IntoIterator<Item = T>) {
        self.0.entry(component).or_default().extend(deps);
    }

    pub fn get(&self, component: &ComponentName) -> Option<&[T]> {
        self.0.get(component).map(Vec::as_slice)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentName> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentName, &[T])> {
        self.0.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Every dependency across all components, component by component.
    pub fn flat_deps(&self) -> impl Iterator<Item = &T> {
        self.0.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ComponentDeps<U> {
        ComponentDeps(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().map(&mut f).collect()))
                .collect(),
        )
    }

    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(&ComponentName, &T) -> Result<U, E>,
    ) -> Result<ComponentDeps<U>, E> {
        let mut out = BTreeMap::new();
        for (component, deps) in &self.0 {
            let mapped = deps
                .iter()
                .map(|d| f(component, d))
                .collect::<Result<Vec<_>, E>>()?;
            out.insert(component.clone(), mapped);
        }
        Ok(ComponentDeps(out))
    }
}

impl<T> FromIterator<(ComponentName, Vec<T>)> for ComponentDeps<T> {
    fn from_iter<I: IntoIterator<Item = (ComponentName, Vec<T>)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (component, deps) in iter {
            out.extend(component, deps);
        }
        out
    }
}
