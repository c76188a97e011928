use crate::expiry_sweeper::DEFAULT_RETENTION_HOURS;
use crate::grant_orchestrator::GrantTarget;
use clap::{Args, Parser, ValueEnum};

#[derive(Debug, Parser)]
#[clap(name = "ingress-warden")]
pub struct ProgramConfig {
    /// IPv4 address to grant temporary ingress for
    pub address: String,

    /// Identity of the requester, as reported by the chat front end
    #[clap(long, env)]
    pub requester_id: String,

    /// Display name recorded in the rule description
    #[clap(long, env, default_value = "user")]
    pub requester_name: String,

    /// Protected target as 'resource:port' or 'resource:port:privileged'
    #[clap(long = "target", env = "TARGETS", value_delimiter = ',', required = true)]
    pub targets: Vec<GrantTarget>,

    /// Requester identity allowed on privileged targets
    #[clap(long, env)]
    pub privileged_requester: String,

    /// Hours a bot-created rule is kept before it is eligible for revocation
    #[clap(long, env, default_value_t = DEFAULT_RETENTION_HOURS)]
    pub retention_hours: i64,

    #[clap(flatten)]
    pub firewall: FirewallConfig,
}

#[derive(Debug, Args)]
pub struct FirewallConfig {
    /// Firewall backend
    #[clap(long = "firewall", env = "FIREWALL", value_enum, ignore_case = true)]
    pub backend: FirewallKind,

    /// Region override (aws backend only)
    #[clap(long, env)]
    pub aws_region: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(non_camel_case_types)]
pub enum FirewallKind {
    none,
    aws,
}

impl ProgramConfig {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
