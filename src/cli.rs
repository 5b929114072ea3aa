use clap::Parser;
use std::path::PathBuf;

/// Masgent Web - schema-driven forms for materials simulation tools
#[derive(Parser, Debug, Clone)]
#[command(name = "masgent-web", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "MASGENT_CONFIG", default_value = "masgent-web.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "MASGENT_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "MASGENT_PORT")]
    pub port: Option<u16>,

    /// Parent directory for per-session file stores
    #[arg(long, env = "MASGENT_SESSIONS_DIR")]
    pub sessions_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["masgent-web"]);
        assert_eq!(cli.config, PathBuf::from("masgent-web.toml"));
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.sessions_dir.is_none());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "masgent-web",
            "--config",
            "custom.toml",
            "--host",
            "0.0.0.0",
            "--port",
            "8501",
            "--sessions-dir",
            "/tmp/masgent",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.host, Some("0.0.0.0".to_string()));
        assert_eq!(cli.port, Some(8501));
        assert_eq!(cli.sessions_dir, Some(PathBuf::from("/tmp/masgent")));
    }
}
