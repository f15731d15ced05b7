//! Logger setup.

use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Environment variable that overrides the configured level.
pub const LEVEL_ENV: &str = "SKYVIEW_LOG";

/// Picks the level to log at. A valid `env` value wins over `configured`.
pub fn resolve_level(configured: LevelFilter, env: Option<&str>) -> LevelFilter {
    env.and_then(|value| value.trim().parse().ok())
        .unwrap_or(configured)
}

/// Installs the global logger, writing timestamped lines to stderr.
///
/// Only the first call has an effect.
pub fn init(level: LevelFilter) {
    INIT.call_once(|| {
        let level = resolve_level(level, std::env::var(LEVEL_ENV).ok().as_deref());
        let result = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{} {:<5} {}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(level)
            .chain(std::io::stderr())
            .apply();

        match result {
            Ok(()) => log::debug!("logging initialized at {level}"),
            Err(e) => eprintln!("failed to install logger: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_configured_level() {
        assert_eq!(resolve_level(LevelFilter::Info, None), LevelFilter::Info);
        assert_eq!(
            resolve_level(LevelFilter::Info, Some("trace")),
            LevelFilter::Trace
        );
        assert_eq!(
            resolve_level(LevelFilter::Warn, Some("nonsense")),
            LevelFilter::Warn
        );
    }

    #[test]
    fn test_init_twice() {
        init(LevelFilter::Debug);
        init(LevelFilter::Error);
        log::info!("still fine");
    }
}
