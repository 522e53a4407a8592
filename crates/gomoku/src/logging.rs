//! Tracing subscriber setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Workspace crates whose events the default filter lets through.
const CRATES: [&str; 5] = [
    "gomoku",
    "gomoku_room",
    "gomoku_game",
    "gomoku_transport",
    "gomoku_protocol",
];

/// Builds the default `EnvFilter` directive for `binary_name` at `level`.
pub fn default_directive(binary_name: &str, level: &str) -> String {
    CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default of `level` for every workspace crate
/// and the binary itself.
pub fn init_tracing(binary_name: &str, level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_workspace_and_binary() {
        let directive = default_directive("gomoku-server", "debug");
        assert_eq!(
            directive,
            "gomoku=debug,gomoku_room=debug,gomoku_game=debug,\
             gomoku_transport=debug,gomoku_protocol=debug,gomoku_server=debug"
        );
    }
}
