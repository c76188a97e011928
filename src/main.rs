mod expiry_sweeper;
mod firewall_gateway;
mod grant_orchestrator;
mod host_address;
mod program_config;
mod protocol;
mod rule_tag;

use crate::expiry_sweeper::ExpirySweeper;
use crate::firewall_gateway::aws_cli::AwsCliFirewallGateway;
use crate::firewall_gateway::noop::NoopFirewallGateway;
use crate::firewall_gateway::FirewallGateway;
use crate::grant_orchestrator::{AccessPolicy, GrantOrchestrator, GrantStatus};
use crate::program_config::{FirewallKind, ProgramConfig};
use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = ProgramConfig::parse();

    // Set up logging
    env_logger::Builder::from_env(Env::default().default_filter_or(if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_module_path(false)
    .init();

    run(config).await
}

async fn run(config: ProgramConfig) -> anyhow::Result<()> {
    let gateway: Box<dyn FirewallGateway> = match config.firewall.backend {
        FirewallKind::none => Box::new(NoopFirewallGateway::new()),
        FirewallKind::aws => Box::new(AwsCliFirewallGateway::new(config.firewall.aws_region)),
    };

    let orchestrator = GrantOrchestrator::new(
        gateway,
        ExpirySweeper::new(chrono::Duration::hours(config.retention_hours)),
        AccessPolicy {
            privileged_requester_id: config.privileged_requester,
        },
    );

    let outcomes = orchestrator
        .grant(
            &config.requester_id,
            &config.requester_name,
            &config.address,
            &config.targets,
        )
        .await?;

    // Per-target status lines; the chat front end relays these verbatim
    let mut any_failed = false;
    for outcome in &outcomes {
        let status = match &outcome.status {
            GrantStatus::Granted => "access granted".to_string(),
            GrantStatus::AlreadyExists => "access already exists".to_string(),
            GrantStatus::Denied => "access denied".to_string(),
            GrantStatus::Failed(reason) => {
                any_failed = true;
                format!("provider error: {reason}")
            }
        };
        println!("{} port {}: {}", outcome.resource_id, outcome.port, status);
    }

    if any_failed {
        anyhow::bail!("One or more targets failed");
    }

    Ok(())
}
