use super::{FirewallGateway, GatewayError, IngressRule};
use crate::host_address::HostAddress;
use std::future::Future;
use std::pin::Pin;

/// Backend that never touches a provider: listings are empty and mutations
/// only log. Used for testing the command surface.
pub struct NoopFirewallGateway {
    _priv: (),
}

impl NoopFirewallGateway {
    pub fn new() -> Self {
        log::info!("Firewall backend is disabled");
        Self { _priv: () }
    }
}

impl FirewallGateway for NoopFirewallGateway {
    fn list_ingress<'a>(
        &'a self,
        _resource_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IngressRule>, GatewayError>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn add_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        address: HostAddress,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            log::debug!(
                "Would add ingress rule: {} port {} from {} ({})",
                resource_id,
                port,
                address.to_cidr(),
                description
            );
            Ok(())
        })
    }

    fn remove_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        addresses: &'a [HostAddress],
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            log::debug!(
                "Would revoke {} ingress rule(s): {} port {}",
                addresses.len(),
                resource_id,
                port
            );
            Ok(())
        })
    }
}
