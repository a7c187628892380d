//! Process-wide structured logging.

use crate::settings::{LogFormat, Settings};
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Returns the default filter directive for a deployment environment.
#[must_use]
pub fn default_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Installs the global tracing subscriber once.
///
/// Events go to standard error so standard output stays free for command
/// output.
///
/// `RUST_LOG` overrides the environment's default level. Later calls, and
/// calls made after another subscriber was installed, leave the existing
/// subscriber in place.
pub fn init(settings: &Settings) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(&settings.environment)));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match settings.log_format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(std::io::stderr().is_terminal())
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        } else {
            tracing::info!(
                environment = %settings.environment,
                format = ?settings.log_format,
                "logging initialised"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{default_level, init};
    use crate::settings::Settings;
    use rstest::rstest;

    #[rstest]
    #[case("production", "info")]
    #[case("test", "warn")]
    #[case("development", "debug")]
    #[case("staging", "debug")]
    fn levels_follow_environment(#[case] environment: &str, #[case] expected: &str) {
        assert_eq!(default_level(environment), expected);
    }

    #[rstest]
    fn repeated_initialisation_is_harmless() {
        let settings = Settings::default();
        init(&settings);
        init(&settings);
    }
}
