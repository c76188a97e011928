//! In-memory gateway for unit tests, with switchable failure modes.

use super::{FirewallGateway, GatewayError, IngressRule};
use crate::host_address::HostAddress;
use crate::protocol::Protocol;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryFirewallGateway {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rules: HashMap<String, Vec<IngressRule>>,
    list_calls: usize,
    add_calls: usize,
    fail_listing: bool,
    fail_add_for: Option<String>,
    fail_remove: bool,
}

impl MemoryFirewallGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, resource_id: &str, rule: IngressRule) {
        self.inner
            .lock()
            .unwrap()
            .rules
            .entry(resource_id.to_string())
            .or_default()
            .push(rule);
    }

    pub fn rules(&self, resource_id: &str) -> Vec<IngressRule> {
        self.inner
            .lock()
            .unwrap()
            .rules
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of add_ingress calls that reached the gateway (including
    /// rejected ones).
    pub fn add_calls(&self) -> usize {
        self.inner.lock().unwrap().add_calls
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    pub fn fail_listing(&self) {
        self.inner.lock().unwrap().fail_listing = true;
    }

    pub fn fail_add_for(&self, resource_id: &str) {
        self.inner.lock().unwrap().fail_add_for = Some(resource_id.to_string());
    }

    pub fn fail_remove(&self) {
        self.inner.lock().unwrap().fail_remove = true;
    }
}

impl FirewallGateway for MemoryFirewallGateway {
    fn list_ingress<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IngressRule>, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.list_calls += 1;
            if inner.fail_listing {
                return Err(GatewayError::Unavailable("listing disabled".to_string()));
            }
            Ok(inner.rules.get(resource_id).cloned().unwrap_or_default())
        })
    }

    fn add_ingress<'a>(
        &'a self,
        resource_id: &'a str,
        port: u16,
        address: HostAddress,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.add_calls += 1;

            if inner.fail_add_for.as_deref() == Some(resource_id) {
                return Err(GatewayError::Rejected("injected add failure".to_string()));
            }

            let rules = inner.rules.entry(resource_id.to_string()).or_default();
            // The real provider rejects exact duplicates
            if rules.iter().any(|rule| {
                rule.port == port
                    && rule.protocol == Protocol::Tcp
                    && rule.source_address == address
            }) {
                return Err(GatewayError::Rejected("duplicate rule".to_string()));
            }

            rules.push(IngressRule {
                port,
                protocol: Protocol::Tcp,
                source_address: address,
                description: description.to_string(),
            });
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
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_remove {
                return Err(GatewayError::Rejected("injected remove failure".to_string()));
            }
            if let Some(rules) = inner.rules.get_mut(resource_id) {
                rules.retain(|rule| {
                    rule.port != port
                        || rule.protocol != Protocol::Tcp
                        || !addresses.contains(&rule.source_address)
                });
            }
            Ok(())
        })
    }
}
