//! # Development Token Issuer
//!
//! Mints a bearer token signed with the configured `JWT_SECRET`, so the
//! ledger API can be exercised with curl during development.
//!
//! ## Usage
//! ```bash
//! # cashier of tenant "demo" at branch "main"
//! cargo run -p tillpoint-api --bin issue-token -- u-1 alice cashier demo main
//!
//! # platform operator without a tenant
//! cargo run -p tillpoint-api --bin issue-token -- u-0 root super_admin
//! ```

use std::env;

use anyhow::{bail, Context};

use tillpoint_api::auth::JwtManager;
use tillpoint_api::ApiConfig;
use tillpoint_core::{Caller, Role};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 || args.len() > 5 {
        bail!("usage: issue-token <user-id> <username> <role> [tenant-id] [branch-id]");
    }

    let role: Role = args[2]
        .parse()
        .with_context(|| format!("unknown role '{}'", args[2]))?;
    let tenant = args.get(3).cloned();
    let branch = args.get(4).cloned();

    let caller = Caller::new(args[0].clone(), args[1].clone(), role, tenant, branch)
        .context("caller rejected")?;

    let config = ApiConfig::load().context("failed to load configuration")?;
    if config.uses_dev_secret() {
        eprintln!("warning: JWT_SECRET not set, signing with the development secret");
    }

    let jwt = JwtManager::new(config.jwt_secret, config.jwt_lifetime_secs);
    let token = jwt.issue(&caller).context("failed to sign token")?;

    println!("{token}");
    Ok(())
}
