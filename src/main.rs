use std::io::{self, BufRead, Write};

use anyhow::Context;
use gradebookd::config::Config;
use gradebookd::{ipc, logging};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("load configuration")?;
    logging::init_logging(&config.log_filter, config.log_format)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scale = config.grade_scale.name(),
        policy = ?config.publish_policy,
        "gradebookd ready"
    );

    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(stdout, "{}", resp);
        let _ = stdout.flush();
    }

    tracing::info!("gradebookd exiting");
    Ok(())
}
