//! Logging setup utilities for the tcpframe binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Enables the given level for the shared crate, the server and client
/// libraries, and the binary itself. The filter can be overridden using the
/// `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "tcpframe_server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use tcpframe_shared::logger::setup_logger;
///
/// setup_logger("tcpframe_server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();
}

fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    let mut targets = vec![
        env!("CARGO_PKG_NAME").replace('-', "_"),
        "tcpframe_server".to_string(),
        "tcpframe_client".to_string(),
    ];
    let binary_target = binary_name.replace('-', "_");
    if !targets.contains(&binary_target) {
        targets.push(binary_target);
    }

    targets
        .iter()
        .map(|target| format!("{}={}", target, default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_all_crates() {
        // テスト項目: デフォルトのフィルタが全クレートとバイナリを含む
        // given (前提条件):
        let binary_name = "tcpframe-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(
            filter,
            "tcpframe_shared=debug,tcpframe_server=debug,tcpframe_client=debug"
        );
    }

    #[test]
    fn test_default_filter_appends_unknown_binary() {
        // テスト項目: 未知のバイナリ名はフィルタの末尾に追加される
        // given (前提条件):
        let binary_name = "load-probe";

        // when (操作):
        let filter = default_filter(binary_name, "info");

        // then (期待する結果):
        assert!(filter.ends_with(",load_probe=info"));
    }
}
