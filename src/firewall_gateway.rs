pub mod aws_cli;
#[cfg(test)]
pub mod memory;
pub mod noop;

use crate::host_address::HostAddress;
use crate::protocol::Protocol;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// An ingress permission as reported by the provider. There is no separate
/// rule id; identity is the (resource, port, protocol, source) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub port: u16,
    pub protocol: Protocol,
    pub source_address: HostAddress,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider could not be reached at all (spawn/transport failure).
    #[error("firewall provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request (permissions, rate limit, duplicate).
    #[error("firewall provider rejected the request: {0}")]
    Rejected(String),
}

/// Capability handle on the cloud firewall. The provider is the sole source
/// of truth for current rule state; implementations must not cache listings.
pub trait FirewallGateway: Send + Sync {
    /// All ingress rules of the given resource that are representable as
    /// single-host TCP/UDP permissions.
    fn list_ingress<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IngressRule>, GatewayError>> + Send + 'a>>;

    /// Adds one TCP ingress rule. Not idempotent: the provider may reject a
    /// duplicate, so callers check [`rule_exists`] first.
    fn add_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        address: HostAddress,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;

    /// Revokes the TCP rules for all given source addresses in one batch.
    fn remove_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        addresses: &'a [HostAddress],
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;
}

impl<T: FirewallGateway + ?Sized> FirewallGateway for std::sync::Arc<T> {
    fn list_ingress<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IngressRule>, GatewayError>> + Send + 'a>> {
        (**self).list_ingress(resource_id)
    }

    fn add_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        address: HostAddress,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        (**self).add_ingress(resource_id, port, address, description)
    }

    fn remove_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        addresses: &'a [HostAddress],
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        (**self).remove_ingress(resource_id, port, addresses)
    }
}

/// Exact-match existence check over a fresh listing: same port, TCP, same
/// single-host source.
pub fn rule_exists(rules: &[IngressRule], port: u16, address: HostAddress) -> bool {
    rules.iter().any(|rule| {
        rule.port == port && rule.protocol == Protocol::Tcp && rule.source_address == address
    })
}
