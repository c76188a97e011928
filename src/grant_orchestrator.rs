use crate::expiry_sweeper::ExpirySweeper;
use crate::firewall_gateway::{self, FirewallGateway};
use crate::host_address::{HostAddress, InvalidAddress};
use crate::rule_tag;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::Mutex;

/// One protected (resource, port) pair a grant request may apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    pub resource_id: String,
    pub port: u16,
    /// Only the configured privileged requester may be granted this target.
    pub privileged: bool,
}

#[derive(Debug, Error)]
pub enum ParseTargetError {
    #[error("expected 'resource:port' or 'resource:port:privileged'")]
    Format,

    #[error("invalid port '{0}'")]
    Port(String),
}

impl FromStr for GrantTarget {
    type Err = ParseTargetError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split(':');

        let resource_id = match parts.next() {
            Some(resource_id) if !resource_id.is_empty() => resource_id.to_string(),
            _ => return Err(ParseTargetError::Format),
        };

        let port_str = parts.next().ok_or(ParseTargetError::Format)?;
        let port = u16::from_str(port_str.trim())
            .map_err(|_| ParseTargetError::Port(port_str.to_string()))?;

        let privileged = match parts.next() {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("privileged") => true,
            Some(_) => return Err(ParseTargetError::Format),
        };

        if parts.next().is_some() {
            return Err(ParseTargetError::Format);
        }

        Ok(Self {
            resource_id,
            port,
            privileged,
        })
    }
}

/// Static authorization policy; passed in at construction so environments
/// can be tested in isolation.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// The single requester identity allowed on privileged targets.
    pub privileged_requester_id: String,
}

/// Terminal per-target state. `Denied` and `AlreadyExists` are ordinary
/// outcomes, not errors; there are no retries within a single request.
#[derive(Debug, PartialEq, Eq)]
pub enum GrantStatus {
    Granted,
    AlreadyExists,
    Denied,
    Failed(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct TargetOutcome {
    pub resource_id: String,
    pub port: u16,
    pub status: GrantStatus,
}

/// Top-level per-request workflow: validate the address, then per target
/// sweep expired rules, check for an existing rule, and add a tagged one.
pub struct GrantOrchestrator {
    gateway: Box<dyn FirewallGateway>,
    sweeper: ExpirySweeper,
    policy: AccessPolicy,
    // Serializes the sweep-check-add sequence; two interleaved grants for
    // the same address could otherwise both pass the existence check.
    grant_lock: Mutex<()>,
}

impl GrantOrchestrator {
    pub fn new(gateway: Box<dyn FirewallGateway>, sweeper: ExpirySweeper, policy: AccessPolicy) -> Self {
        Self {
            gateway,
            sweeper,
            policy,
            grant_lock: Mutex::new(()),
        }
    }

    /// Processes one grant request against the given targets, in order. One
    /// target's failure never stops evaluation of the remaining targets.
    pub async fn grant(
        &self,
        requester_id: &str,
        requester_name: &str,
        raw_address: &str,
        targets: &[GrantTarget],
    ) -> Result<Vec<TargetOutcome>, InvalidAddress> {
        let address = HostAddress::validate(raw_address)?;

        let _guard = self.grant_lock.lock().await;
        let now = chrono::Utc::now().naive_utc();

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let status = self
                .grant_one(requester_id, requester_name, address, target, now)
                .await;
            outcomes.push(TargetOutcome {
                resource_id: target.resource_id.clone(),
                port: target.port,
                status,
            });
        }

        Ok(outcomes)
    }

    async fn grant_one(
        &self,
        requester_id: &str,
        requester_name: &str,
        address: HostAddress,
        target: &GrantTarget,
        now: chrono::NaiveDateTime,
    ) -> GrantStatus {
        if target.privileged && requester_id != self.policy.privileged_requester_id {
            log::info!(
                "Denied requester {} on privileged target {} port {}",
                requester_id,
                target.resource_id,
                target.port
            );
            return GrantStatus::Denied;
        }

        // Opportunistic cleanup; a failed sweep is skipped, not fatal
        if let Err(e) = self
            .sweeper
            .sweep(self.gateway.as_ref(), &target.resource_id, target.port, now)
            .await
        {
            log::warn!(
                "Skipping expiry sweep for {} port {}: {}",
                target.resource_id,
                target.port,
                e
            );
        }

        // Fresh listing for the duplicate check. If it fails, existence is
        // unknown and granting blind could duplicate a live rule: fail closed.
        let rules = match self.gateway.list_ingress(&target.resource_id).await {
            Ok(rules) => rules,
            Err(e) => {
                log::warn!(
                    "Cannot check existing rules on {} port {}, not granting: {}",
                    target.resource_id,
                    target.port,
                    e
                );
                return GrantStatus::Failed(e.to_string());
            }
        };

        if firewall_gateway::rule_exists(&rules, target.port, address) {
            log::info!(
                "Ingress rule already exists: {} port {} from {}",
                target.resource_id,
                target.port,
                address
            );
            return GrantStatus::AlreadyExists;
        }

        let description = rule_tag::encode(requester_name, now);
        match self
            .gateway
            .add_ingress(&target.resource_id, target.port, address, &description)
            .await
        {
            Ok(()) => {
                log::info!(
                    "Granted ingress: {} port {} from {} for {}",
                    target.resource_id,
                    target.port,
                    address,
                    requester_name
                );
                GrantStatus::Granted
            }
            Err(e) => {
                log::error!(
                    "Failed to grant ingress on {} port {}: {}",
                    target.resource_id,
                    target.port,
                    e
                );
                GrantStatus::Failed(e.to_string())
            }
        }
    }
}
