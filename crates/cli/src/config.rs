pub use taskflow_core::config::*;

use crate::cli::Cli;

/// Resolve the data directory and store backend from global flags, falling back to the
/// environment and platform defaults.
pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::discover(cli.data_dir.clone())?;
    if let Some(timeout) = cli.api_timeout {
        config = config.with_remote_timeout(timeout);
    }
    let env_remote = match config.backend() {
        StoreBackend::Remote { base_url, .. } if cli.api_token.is_some() => Some(base_url.clone()),
        _ => None,
    };
    match cli.api_url.clone().or(env_remote) {
        Some(url) => {
            let token = cli.api_token.clone().or_else(AppConfig::env_api_token);
            Ok(config.with_remote(url, token))
        }
        None => Ok(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn api_url_flag_selects_remote_backend() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let cli = Cli::parse_from([
            "taskflow",
            "--data-dir",
            data_dir,
            "--api-url",
            "https://records.example.com/",
            "--api-token",
            "secret",
            "--api-timeout",
            "4",
            "stats",
        ]);
        let config = from_cli(&cli).unwrap();
        match config.backend() {
            StoreBackend::Remote {
                base_url,
                token,
                timeout,
            } => {
                assert_eq!(base_url, "https://records.example.com");
                assert_eq!(token.as_deref(), Some("secret"));
                assert_eq!(*timeout, std::time::Duration::from_secs(4));
            }
            other => panic!("expected remote backend, got {other:?}"),
        }
        assert_eq!(config.data_dir(), dir.path());
    }
}
