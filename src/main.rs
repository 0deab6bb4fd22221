mod app;
mod auth;
mod config;
mod db;
mod error;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;

const DEFAULT_LOG_FILTER: &str = "examprep=debug,axum=info,tower_http=info";

/// `RUST_LOG` picks the filter, `LOG_FORMAT=json` switches to JSON lines.
fn log_settings<F>(lookup: F) -> (String, bool)
where
    F: Fn(&str) -> Option<String>,
{
    let env_filter = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let json_logs = lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));
    (env_filter, json_logs)
}

fn init_tracing() {
    let (env_filter, json_logs) = log_settings(|key| std::env::var(key).ok());

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    // Missing secret or bad settings abort here, before anything binds.
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;
    tracing::info!(
        issuer = %config.jwt.issuer,
        ttl_minutes = config.jwt.ttl_minutes,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    let app = app::build_app(state.clone());
    app::serve(app, &state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_settings_default_to_text_with_crate_filter() {
        let (filter, json) = log_settings(|_| None);
        assert_eq!(filter, DEFAULT_LOG_FILTER);
        assert!(!json);
    }

    #[test]
    fn log_settings_read_filter_and_format() {
        let (filter, json) = log_settings(|key| match key {
            "RUST_LOG" => Some("warn".into()),
            "LOG_FORMAT" => Some("JSON".into()),
            _ => None,
        });
        assert_eq!(filter, "warn");
        assert!(json);

        let (_, json) = log_settings(|key| (key == "LOG_FORMAT").then(|| "pretty".into()));
        assert!(!json);
    }
}
