use berth_network::HostsTable;
use std::net::IpAddr;
use std::sync::Arc;

/// A name source consulted by the server. `None` means the resolver has
/// no opinion and the next one is asked.
pub trait Resolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Vec<IpAddr>>;
}

/// Answers from the network service's container hosts table.
pub struct HostsResolver {
    hosts: HostsTable,
}

impl HostsResolver {
    pub fn new(hosts: HostsTable) -> Self {
        Self { hosts }
    }
}

impl Resolver for HostsResolver {
    fn resolve(&self, name: &str) -> Option<Vec<IpAddr>> {
        self.hosts.lookup(name)
    }
}

/// Asks each resolver in order; a name no resolver knows is NXDOMAIN.
pub struct CompositeResolver {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    pub fn resolve(&self, name: &str) -> Option<Vec<IpAddr>> {
        self.resolvers.iter().find_map(|r| r.resolve(name))
    }
}
