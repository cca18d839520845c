//! Source contact address to destination handle mapping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed table from source e-mail address to GitHub login
///
/// Loaded from the `[identities]` table of the config file. Lookups never
/// fail: an unknown address simply has no handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap(BTreeMap<String, String>);

impl IdentityMap {
    /// Destination login for an address, if known
    pub fn handle(&self, email: &str) -> Option<&str> {
        self.0.get(email).map(String::as_str).filter(|h| !h.is_empty())
    }

    /// `@login` for an address, or an empty string when unmapped
    pub fn mention(&self, email: &str) -> String {
        self.handle(email)
            .map(|h| format!("@{}", h))
            .unwrap_or_default()
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdentityMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_addresses() {
        let map: IdentityMap = [("gavin@example.com", "gavin-ts")].into_iter().collect();

        assert_eq!(map.handle("gavin@example.com"), Some("gavin-ts"));
        assert_eq!(map.mention("gavin@example.com"), "@gavin-ts");
        assert_eq!(map.handle("nobody@example.com"), None);
        assert_eq!(map.mention("nobody@example.com"), "");
    }

    #[test]
    fn test_parse_from_toml_table() {
        let toml = r#"
"alex@example.com" = "alixander"
"julio@example.com" = "ejulio-ts"
"#;
        let map: IdentityMap = toml::from_str(toml).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.handle("alex@example.com"), Some("alixander"));
    }
}
