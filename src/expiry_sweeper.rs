use crate::firewall_gateway::{FirewallGateway, GatewayError};
use crate::host_address::HostAddress;
use crate::protocol::Protocol;
use crate::rule_tag;
use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_RETENTION_HOURS: i64 = 48;

/// Finds and revokes bot-created rules that have outlived the retention
/// window. There is no background timer; a sweep runs inline before each
/// grant for the same (resource, port) pair.
pub struct ExpirySweeper {
    retention: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Bot-tagged rules on the port still within the retention window.
    pub retained: usize,
    /// Source addresses selected for revocation.
    pub expired: Vec<HostAddress>,
    /// Whether the selected rules were actually revoked. False only when the
    /// batch revoke call itself failed.
    pub revoked: bool,
}

impl ExpirySweeper {
    pub fn new(retention: Duration) -> Self {
        Self { retention }
    }

    /// Sweeps (resource, port). Rules without the `bot=true` marker or with
    /// an undecodable tag are never candidates; losing the revoke call is
    /// logged and skipped so the grant that triggered the sweep can proceed.
    /// Only a failed listing surfaces as an error.
    pub async fn sweep(
        &self,
        gateway: &dyn FirewallGateway,
        resource_id: &str,
        port: u16,
        now: NaiveDateTime,
    ) -> Result<SweepReport, GatewayError> {
        let cutoff = now - self.retention;
        let rules = gateway.list_ingress(resource_id).await?;

        let mut report = SweepReport {
            revoked: true,
            ..SweepReport::default()
        };

        for rule in rules {
            if rule.port != port || rule.protocol != Protocol::Tcp {
                continue;
            }
            let Some(tag) = rule_tag::decode(&rule.description) else {
                continue;
            };
            if tag.created_at < cutoff {
                report.expired.push(rule.source_address);
            } else {
                report.retained += 1;
            }
        }

        if !report.expired.is_empty() {
            match gateway
                .remove_ingress(resource_id, port, &report.expired)
                .await
            {
                Ok(()) => {
                    log::info!(
                        "Revoked {} expired ingress rule(s) on {} port {}",
                        report.expired.len(),
                        resource_id,
                        port
                    );
                }
                Err(e) => {
                    // Entries may already be gone on the provider side; a
                    // lost cleanup pass must not block the pending grant.
                    log::warn!(
                        "Failed to revoke {} expired ingress rule(s) on {} port {}: {}",
                        report.expired.len(),
                        resource_id,
                        port,
                        e
                    );
                    report.revoked = false;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::firewall_gateway::memory::MemoryFirewallGateway;
    use crate::firewall_gateway::IngressRule;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    const SG: &str = "sg-test";
    const PORT: u16 = 3306;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn address(raw: &str) -> HostAddress {
        HostAddress::validate(raw).unwrap()
    }

    fn bot_rule(source: &str, created_at: NaiveDateTime) -> IngressRule {
        IngressRule {
            port: PORT,
            protocol: Protocol::Tcp,
            source_address: address(source),
            description: rule_tag::encode("alice", created_at),
        }
    }

    fn sweeper() -> ExpirySweeper {
        ExpirySweeper::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }

    #[tokio::test]
    async fn revokes_rule_one_second_past_retention() {
        let gateway = MemoryFirewallGateway::new();
        let created_at = at(12);
        gateway.seed(SG, bot_rule("10.0.0.5", created_at));

        let now = created_at + Duration::hours(48) + Duration::seconds(1);
        let report = sweeper().sweep(&gateway, SG, PORT, now).await.unwrap();

        assert_eq!(report.expired, vec![address("10.0.0.5")]);
        assert!(report.revoked);
        assert!(gateway.rules(SG).is_empty());
    }

    #[tokio::test]
    async fn keeps_rule_one_second_before_retention() {
        let gateway = MemoryFirewallGateway::new();
        let created_at = at(12);
        gateway.seed(SG, bot_rule("10.0.0.5", created_at));

        let now = created_at + Duration::hours(48) - Duration::seconds(1);
        let report = sweeper().sweep(&gateway, SG, PORT, now).await.unwrap();

        assert!(report.expired.is_empty());
        assert_eq!(report.retained, 1);
        assert_eq!(gateway.rules(SG).len(), 1);
    }

    #[tokio::test]
    async fn keeps_rule_at_exact_retention_boundary() {
        let gateway = MemoryFirewallGateway::new();
        let created_at = at(12);
        gateway.seed(SG, bot_rule("10.0.0.5", created_at));

        let now = created_at + Duration::hours(48);
        let report = sweeper().sweep(&gateway, SG, PORT, now).await.unwrap();

        assert!(report.expired.is_empty());
        assert_eq!(report.retained, 1);
    }

    #[tokio::test]
    async fn never_touches_unmarked_or_malformed_rules() {
        let gateway = MemoryFirewallGateway::new();
        gateway.seed(
            SG,
            IngressRule {
                port: PORT,
                protocol: Protocol::Tcp,
                source_address: address("10.0.0.1"),
                description: "office uplink, do not remove".to_string(),
            },
        );
        gateway.seed(
            SG,
            IngressRule {
                port: PORT,
                protocol: Protocol::Tcp,
                source_address: address("10.0.0.2"),
                description: "bot=true;u=alice;dt=not-a-timestamp".to_string(),
            },
        );

        let report = sweeper().sweep(&gateway, SG, PORT, at(12)).await.unwrap();

        assert!(report.expired.is_empty());
        assert_eq!(report.retained, 0);
        assert_eq!(gateway.rules(SG).len(), 2);
    }

    #[tokio::test]
    async fn ignores_other_ports_and_protocols() {
        let gateway = MemoryFirewallGateway::new();
        let stale = at(0) - Duration::hours(72);
        gateway.seed(
            SG,
            IngressRule {
                port: 22,
                ..bot_rule("10.0.0.1", stale)
            },
        );
        gateway.seed(
            SG,
            IngressRule {
                protocol: Protocol::Udp,
                ..bot_rule("10.0.0.2", stale)
            },
        );

        let report = sweeper().sweep(&gateway, SG, PORT, at(12)).await.unwrap();

        assert!(report.expired.is_empty());
        assert_eq!(gateway.rules(SG).len(), 2);
    }

    #[tokio::test]
    async fn revokes_expired_rules_in_one_batch() {
        let gateway = MemoryFirewallGateway::new();
        let stale = at(0) - Duration::hours(72);
        gateway.seed(SG, bot_rule("10.0.0.1", stale));
        gateway.seed(SG, bot_rule("10.0.0.2", stale));
        gateway.seed(SG, bot_rule("10.0.0.3", at(11)));

        let report = sweeper().sweep(&gateway, SG, PORT, at(12)).await.unwrap();

        assert_eq!(report.expired, vec![address("10.0.0.1"), address("10.0.0.2")]);
        assert_eq!(report.retained, 1);
        assert_eq!(gateway.rules(SG), vec![bot_rule("10.0.0.3", at(11))]);
    }

    #[tokio::test]
    async fn failed_revoke_is_skipped_not_escalated() {
        let gateway = MemoryFirewallGateway::new();
        let stale = at(0) - Duration::hours(72);
        gateway.seed(SG, bot_rule("10.0.0.1", stale));
        gateway.fail_remove();

        let report = sweeper().sweep(&gateway, SG, PORT, at(12)).await.unwrap();

        assert_eq!(report.expired, vec![address("10.0.0.1")]);
        assert!(!report.revoked);
        assert_eq!(gateway.rules(SG).len(), 1);
    }

    #[tokio::test]
    async fn failed_listing_surfaces_as_error() {
        let gateway = MemoryFirewallGateway::new();
        gateway.fail_listing();

        let result = sweeper().sweep(&gateway, SG, PORT, at(12)).await;

        assert_matches!(result, Err(GatewayError::Unavailable(_)));
    }
}
