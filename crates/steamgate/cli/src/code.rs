//! `code` and `time` commands.
//!
//! The code goes to stdout on its own line so it can be piped; the validity
//! window is reported on stderr.

use steamgate_core::{AuthCode, Executor, ExecutorConfig, current_code, generate_code};

use crate::colors;

/// Print the Steam Guard code for `secret`.
///
/// With `at`, the code is computed offline for that server time. Otherwise
/// the server time comes from a worker.
pub fn execute(
    config: ExecutorConfig,
    secret: &str,
    at: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let code = match at {
        Some(server_time) => generate_code(secret, server_time)?,
        None => with_executor(config, |executor| current_code(executor, secret))?,
    };

    if json {
        println!("{}", serde_json::to_string(&code)?);
    } else {
        println!("{}", code.code);
        print_window(&code);
    }
    Ok(())
}

/// Print the server time reported by the worker.
pub fn server_time(config: ExecutorConfig) -> anyhow::Result<()> {
    let time = with_executor(config, Executor::server_time)?;
    println!("{}", time);
    Ok(())
}

/// Run `f` against a freshly initialized executor and always shut it down.
fn with_executor<T>(
    config: ExecutorConfig,
    f: impl FnOnce(&mut Executor) -> steamgate_core::Result<T>,
) -> steamgate_core::Result<T> {
    let mut executor = Executor::new(config);
    executor.init()?;
    let result = f(&mut executor);
    executor.shutdown();
    result
}

fn print_window(code: &AuthCode) {
    let remaining = code.seconds_remaining(code.server_time);
    let color = if remaining <= 5 {
        colors::YELLOW
    } else {
        colors::GREEN
    };
    eprintln!(
        "{}valid for {}{}s{}{} (server time {}){}",
        colors::DIM,
        colors::RESET,
        color,
        remaining,
        colors::DIM,
        code.server_time,
        colors::RESET
    );
}
