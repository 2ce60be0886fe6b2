use std::{
    collections::{hash_map::Iter, HashMap},
    env,
};
use tracing::{debug, trace};

/// Named string parameters available to parameter directives.
///
/// Values are resolved when they are set. A value of the form `env(KEY)`,
/// where `KEY` is not empty, is replaced by the current value of the
/// environment variable `KEY`, or by an empty string if that variable is not
/// set. Every other value, including the literal `env()`, is stored as-is.
///
/// ## Example
///
/// ```
/// use field_injector::ParameterBag;
///
/// std::env::set_var("PARAMETER_BAG_DOCTEST_HOST", "db.local");
///
/// let mut parameters = ParameterBag::new();
/// parameters.set("host", "env(PARAMETER_BAG_DOCTEST_HOST)");
/// parameters.set("empty", "env()");
///
/// assert_eq!(Some("db.local"), parameters.get("host"));
/// assert_eq!(Some("env()"), parameters.get("empty"));
/// assert_eq!(None, parameters.get("port"));
/// ```
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct ParameterBag {
    parameters: HashMap<String, String>,
}

impl ParameterBag {
    /// Creates an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        ParameterBag::default()
    }

    /// Resolves `value` and stores it under `name`. If a parameter was
    /// already stored under that name, its value is returned.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let name = name.into();
        let value = resolve(value.into());
        trace!(parameter = %name, "parameter set");
        self.parameters.insert(name, value)
    }

    /// Gets the resolved value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Returns whether a parameter has been set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Removes a parameter, returning its value if it was set.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    /// Gets the number of parameters that have been set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Returns whether no parameters have been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Iterates over every parameter name and its resolved value, in no
    /// particular order.
    pub fn iter(&self) -> ParametersIter<'_> {
        ParametersIter {
            inner: self.parameters.iter(),
        }
    }

    /// Moves every parameter of `other` into this bag. The values of `other`
    /// are already resolved and are not substituted again.
    pub(crate) fn merge(&mut self, other: ParameterBag) {
        self.parameters.extend(other.parameters);
    }
}

impl<K, V> Extend<(K, V)> for ParameterBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            drop(self.set(name, value));
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = ParameterBag::new();
        parameters.extend(iter);
        parameters
    }
}

impl<'a> IntoIterator for &'a ParameterBag {
    type Item = (&'a str, &'a str);
    type IntoIter = ParametersIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the parameters of a [`ParameterBag`].
pub struct ParametersIter<'a> {
    inner: Iter<'a, String, String>,
}

impl<'a> Iterator for ParametersIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Gets the environment variable named by an `env(KEY)` value.
fn env_key(value: &str) -> Option<&str> {
    value
        .strip_prefix("env(")?
        .strip_suffix(')')
        .filter(|key| !key.is_empty())
}

fn resolve(value: String) -> String {
    let key = match env_key(&value) {
        Some(key) => key,
        None => return value,
    };

    match env::var(key) {
        Ok(resolved) => resolved,
        Err(error) => {
            debug!(variable = key, %error, "environment variable unavailable, using an empty value");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "123";

    #[test]
    fn can_resolve_param() {
        let mut bag = ParameterBag::new();
        bag.set("password", PASSWORD);
        assert_eq!(Some(PASSWORD), bag.get("password"));
    }

    #[test]
    fn can_resolve_param_from_env() {
        env::set_var("PARAMETERS_TEST_PASSWORD", PASSWORD);
        let mut bag = ParameterBag::new();
        bag.set("password", "env(PARAMETERS_TEST_PASSWORD)");
        assert_eq!(Some(PASSWORD), bag.get("password"));
    }

    #[test]
    fn unset_env_resolves_to_empty_string() {
        env::remove_var("PARAMETERS_TEST_UNSET");
        let mut bag = ParameterBag::new();
        bag.set("missing", "env(PARAMETERS_TEST_UNSET)");
        assert_eq!(Some(""), bag.get("missing"));
    }

    #[test]
    fn empty_env_directive_is_literal() {
        let mut bag = ParameterBag::new();
        bag.set("literal", "env()");
        assert_eq!(Some("env()"), bag.get("literal"));
    }

    #[test]
    fn partial_env_directives_are_literal() {
        let mut bag = ParameterBag::new();
        bag.set("open", "env(HOME");
        bag.set("prefixed", "xenv(HOME)");
        assert_eq!(Some("env(HOME"), bag.get("open"));
        assert_eq!(Some("xenv(HOME)"), bag.get("prefixed"));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut bag = ParameterBag::new();
        assert_eq!(None, bag.set("name", "a"));
        assert_eq!(Some("a".to_owned()), bag.set("name", "b"));
        assert_eq!(Some("b"), bag.get("name"));
        assert_eq!(1, bag.len());
    }

    #[test]
    fn removed_parameters_are_gone() {
        let mut bag = ParameterBag::new();
        bag.set("name", "a");
        assert!(bag.contains("name"));
        assert!(!bag.contains("other"));

        assert_eq!(Some("a".to_owned()), bag.remove("name"));
        assert_eq!(None, bag.remove("name"));
        assert!(!bag.contains("name"));
        assert!(bag.is_empty());
    }

    #[test]
    fn merge_does_not_substitute_again() {
        env::set_var("PARAMETERS_TEST_INDIRECT", "env(PARAMETERS_TEST_OTHER)");
        env::set_var("PARAMETERS_TEST_OTHER", "other");

        let mut module_bag = ParameterBag::new();
        module_bag.set("indirect", "env(PARAMETERS_TEST_INDIRECT)");

        let mut bag = ParameterBag::new();
        bag.merge(module_bag);
        assert_eq!(Some("env(PARAMETERS_TEST_OTHER)"), bag.get("indirect"));
    }

    #[test]
    fn collects_from_pairs() {
        let bag: ParameterBag =
            vec![("username", "john"), ("password", PASSWORD)]
                .into_iter()
                .collect();

        assert_eq!(2, bag.len());
        assert_eq!(Some("john"), bag.get("username"));

        let mut pairs: Vec<_> = bag.iter().collect();
        pairs.sort_unstable();
        assert_eq!(vec![("password", PASSWORD), ("username", "john")], pairs);
    }
}
