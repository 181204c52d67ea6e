//! leasegate-check: evaluate one hook request against an enforcement config.
//!
//! Usage: `leasegate-check <config.yaml> <request.json>`
//!
//! Prints the decision as JSON. Exit status: 0 allow, 1 deny, 2 error,
//! 3 setup failure, 64 usage.

use std::fs;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use leasegate_core::error::{LeaseGateError, Result};
use leasegate_core::Decision;
use leasegate_enforcement::request::HookRequest;
use leasegate_enforcement::{config, EnforcementChain, FilterRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(cfg_path), Some(req_path)) = (args.next(), args.next()) else {
        eprintln!("usage: leasegate-check <config.yaml> <request.json>");
        return ExitCode::from(64);
    };

    match run(&cfg_path, &req_path).await {
        Ok(decision) => {
            match serde_json::to_string_pretty(&decision) {
                Ok(s) => println!("{s}"),
                Err(e) => tracing::error!(error = %e, "decision encode failed"),
            }
            match decision {
                Decision::Allow => ExitCode::SUCCESS,
                Decision::Deny { .. } => ExitCode::from(1),
                Decision::Error { .. } => ExitCode::from(2),
            }
        }
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "leasegate-check failed");
            ExitCode::from(3)
        }
    }
}

async fn run(cfg_path: &str, req_path: &str) -> Result<Decision> {
    let cfg = config::load_from_file(cfg_path)?;
    let chain = EnforcementChain::from_config(&cfg, &FilterRegistry::with_builtin())?;

    let raw = fs::read_to_string(req_path)
        .map_err(|e| LeaseGateError::InvalidRequest(format!("read {req_path} failed: {e}")))?;
    let req = HookRequest::from_json(&raw)?;

    Ok(chain.evaluate(&req.context, req.change()?).await)
}
