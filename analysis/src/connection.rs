use crate::registry::IdentityRegistry;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A connection as the analysis sees it: identity and activation, no session state
pub struct Connection {
    /// real name, keys all samples
    pub name: String,
    /// name shown in reports when registered, the registry holds the current one
    /// since a later alias collision renames it
    pub display_name: String,
    pub active: bool,
}

impl Connection {
    /// create a connection and register its display name
    pub fn new(
        name: &str,
        alias: Option<&str>,
        active: bool,
        anonymous: bool,
        registry: &mut IdentityRegistry,
    ) -> Self {
        Self {
            name: name.to_string(),
            display_name: registry.register(name, alias, anonymous),
            active,
        }
    }
}
