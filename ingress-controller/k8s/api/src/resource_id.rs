use std::{fmt, str::FromStr};

/// Identifies a namespaced object. Formatted as `<namespace>/<name>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource key {0:?}: expected <namespace>/<name>")]
pub struct InvalidKey(pub String);

// === impl ResourceId ===

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Resolves a reference that may omit its namespace, e.g. a route name in a
    /// VirtualServer. Unqualified references resolve in `default_ns`.
    pub fn from_reference(reference: &str, default_ns: &str) -> Self {
        match reference.split_once('/') {
            Some((ns, name)) => Self::new(ns, name),
            None => Self::new(default_ns, reference),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(InvalidKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys() {
        assert_eq!(
            "default/cafe".parse::<ResourceId>(),
            Ok(ResourceId::new("default", "cafe"))
        );
        assert!("cafe".parse::<ResourceId>().is_err());
        assert!("/cafe".parse::<ResourceId>().is_err());
        assert!("a/b/c".parse::<ResourceId>().is_err());
    }

    #[test]
    fn resolves_unqualified_references() {
        assert_eq!(
            ResourceId::from_reference("coffee", "default"),
            ResourceId::new("default", "coffee")
        );
        assert_eq!(
            ResourceId::from_reference("tea-ns/tea", "default"),
            ResourceId::new("tea-ns", "tea")
        );
        assert_eq!(ResourceId::new("ns", "name").to_string(), "ns/name");
    }
}
