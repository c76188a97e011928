use super::{FirewallGateway, GatewayError, IngressRule};
use crate::host_address::HostAddress;
use crate::protocol::Protocol;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;

const AWS_CLI: &str = "aws";

/// Gateway that drives the provider through the `aws` command line client.
/// Credentials and default region come from the CLI's own environment.
pub struct AwsCliFirewallGateway {
    region: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupsResponse {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroup {
    #[serde(default)]
    ip_permissions: Vec<IpPermission>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpPermission {
    from_port: Option<i64>,
    to_port: Option<i64>,
    ip_protocol: String,
    #[serde(default)]
    ip_ranges: Vec<IpRange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpRange {
    cidr_ip: String,
    #[serde(default)]
    description: String,
}

impl AwsCliFirewallGateway {
    pub fn new(region: Option<String>) -> Self {
        match &region {
            Some(region) => log::info!("Using aws backend, region \"{}\"", region),
            None => log::info!("Using aws backend, region from CLI environment"),
        }
        Self { region }
    }

    async fn run_aws(&self, args: &[&str]) -> Result<Vec<u8>, GatewayError> {
        let mut command = tokio::process::Command::new(AWS_CLI);
        command.args(args).args(["--output", "json"]);
        if let Some(region) = &self.region {
            command.args(["--region", region]);
        }

        match command.output().await {
            Ok(output) if output.status.success() => Ok(output.stdout),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim_end();
                log::error!(
                    "'{} {}' failed: [{}] {}",
                    AWS_CLI,
                    args.join(" "),
                    output.status,
                    stderr
                );
                Err(GatewayError::Rejected(stderr.to_string()))
            }
            Err(e) => {
                log::error!("Failed to start {}: {}", AWS_CLI, e);
                Err(GatewayError::Unavailable(e.to_string()))
            }
        }
    }

    /// One permission block in the provider's request/response shape:
    /// single-port TCP with the given source ranges.
    fn permission_json(port: u16, ranges: serde_json::Value) -> String {
        serde_json::json!([{
            "FromPort": port,
            "ToPort": port,
            "IpProtocol": "tcp",
            "IpRanges": ranges,
        }])
        .to_string()
    }
}

impl FirewallGateway for AwsCliFirewallGateway {
    fn list_ingress<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IngressRule>, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let stdout = self
                .run_aws(&["ec2", "describe-security-groups", "--group-ids", resource_id])
                .await?;

            let response: DescribeSecurityGroupsResponse = serde_json::from_slice(&stdout)
                .map_err(|e| {
                    log::error!("Unparseable describe-security-groups response: {}", e);
                    GatewayError::Unavailable(format!("unexpected provider response: {e}"))
                })?;

            let mut rules = Vec::new();
            for group in response.security_groups {
                for permission in group.ip_permissions {
                    // Only exact single-port TCP/UDP permissions are in scope;
                    // port ranges and other protocols are left alone.
                    let (Some(from), Some(to)) = (permission.from_port, permission.to_port)
                    else {
                        continue;
                    };
                    let (Some(protocol), Ok(port)) =
                        (Protocol::parse(&permission.ip_protocol), u16::try_from(from))
                    else {
                        continue;
                    };
                    if from != to {
                        continue;
                    }

                    for range in permission.ip_ranges {
                        // Wider CIDRs cannot match a single-host grant
                        let Some(source_address) = HostAddress::from_cidr(&range.cidr_ip) else {
                            continue;
                        };
                        rules.push(IngressRule {
                            port,
                            protocol,
                            source_address,
                            description: range.description,
                        });
                    }
                }
            }

            Ok(rules)
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
            let permissions = Self::permission_json(
                port,
                serde_json::json!([{
                    "CidrIp": address.to_cidr(),
                    "Description": description,
                }]),
            );

            self.run_aws(&[
                "ec2",
                "authorize-security-group-ingress",
                "--group-id",
                resource_id,
                "--ip-permissions",
                &permissions,
            ])
            .await?;

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
            if addresses.is_empty() {
                return Ok(());
            }

            let ranges = addresses
                .iter()
                .map(|address| serde_json::json!({ "CidrIp": address.to_cidr() }))
                .collect::<Vec<_>>();
            let permissions = Self::permission_json(port, serde_json::Value::Array(ranges));

            self.run_aws(&[
                "ec2",
                "revoke-security-group-ingress",
                "--group-id",
                resource_id,
                "--ip-permissions",
                &permissions,
            ])
            .await?;

            Ok(())
        })
    }
}
