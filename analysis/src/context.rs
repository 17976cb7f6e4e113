use crate::{
    connection::Connection,
    query::{Query, QueryConfig, QueryError},
    registry::IdentityRegistry,
};

#[derive(Debug, Clone, Default)]
/// State shared by every experiment loaded into one process
///
/// Holds the identity registry and the query template. Aliases registered here
/// stay stable across several experiment loads until `reset` is called.
pub struct BenchmarkContext {
    registry: IdentityRegistry,
    template: Option<QueryConfig>,
    anonymous: bool,
}

impl BenchmarkContext {
    pub fn new(anonymous: bool) -> Self {
        Self {
            registry: IdentityRegistry::new(),
            template: None,
            anonymous,
        }
    }

    pub fn set_template(&mut self, template: Option<QueryConfig>) {
        self.template = template;
    }

    pub fn query(&self, config: &QueryConfig) -> Result<Query, QueryError> {
        Query::new(config, self.template.as_ref())
    }

    pub fn connection(&mut self, name: &str, alias: Option<&str>, active: bool) -> Connection {
        Connection::new(name, alias, active, self.anonymous, &mut self.registry)
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// drop all registered aliases and the template
    pub fn reset(&mut self) {
        self.registry.reset();
        self.template = None;
    }
}
