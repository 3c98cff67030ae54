//! Log output for the bridge and its CLI

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate and
/// `rascal_process`, raised to `debug` with `verbose`. Installing twice is a
/// no-op, so tests and embedding hosts may call this freely.
pub fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,rascal_lsp_client={level},rascal_process={level},rascal_bridge={level}"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_thread_ids(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging("info", false);
        init_logging("debug", true);
        tracing::info!("still logging");
    }
}
