mod serve;

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::core::terminal::{self, GuideSection, print_error};

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 8484;

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("serve", "Run the bridge daemon in the foreground")
        .print();

    GuideSection::new("Diagnostics")
        .command("config", "Print the effective configuration")
        .print();

    println!(
        "\n {} {} <command> [--api-host <host>] [--api-port <port>] [--config <path>]\n",
        style("Usage:").bold(),
        style("taskbridge").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServeFlags {
    pub api_host: String,
    pub api_port: u16,
    pub config_path: Option<PathBuf>,
}

pub(crate) fn parse_serve_flags(args: &[String], start: usize) -> ServeFlags {
    let mut flags = ServeFlags {
        api_host: DEFAULT_API_HOST.to_string(),
        api_port: DEFAULT_API_PORT,
        config_path: None,
    };
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--api-host" => {
                if i + 1 < args.len() {
                    flags.api_host = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-port" => {
                if i + 1 < args.len() {
                    flags.api_port = args[i + 1].parse().unwrap_or(DEFAULT_API_PORT);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    flags.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    flags
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() <= 1 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" => {
            let flags = parse_serve_flags(&args, 2);
            serve::run_serve(flags).await
        }
        "config" => {
            let flags = parse_serve_flags(&args, 2);
            let config = crate::core::config::BridgeConfig::load(flags.config_path.as_deref())?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            print_error(&format!("Unknown command: {}", cmd));
            print_help();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_API_PORT, parse_serve_flags};
    use std::path::PathBuf;

    #[test]
    fn parse_serve_flags_reads_host_port_and_config() {
        let args = vec![
            "taskbridge".to_string(),
            "serve".to_string(),
            "--api-host".to_string(),
            "0.0.0.0".to_string(),
            "--api-port".to_string(),
            "9100".to_string(),
            "--config".to_string(),
            "/tmp/bridge.toml".to_string(),
        ];
        let flags = parse_serve_flags(&args, 2);
        assert_eq!(flags.api_host, "0.0.0.0");
        assert_eq!(flags.api_port, 9100);
        assert_eq!(flags.config_path, Some(PathBuf::from("/tmp/bridge.toml")));
    }

    #[test]
    fn parse_serve_flags_defaults_when_absent() {
        let args = vec!["taskbridge".to_string(), "serve".to_string()];
        let flags = parse_serve_flags(&args, 2);
        assert_eq!(flags.api_host, "127.0.0.1");
        assert_eq!(flags.api_port, DEFAULT_API_PORT);
        assert!(flags.config_path.is_none());
    }

    #[test]
    fn parse_serve_flags_ignores_bad_port() {
        let args = vec![
            "taskbridge".to_string(),
            "serve".to_string(),
            "--api-port".to_string(),
            "not-a-port".to_string(),
        ];
        let flags = parse_serve_flags(&args, 2);
        assert_eq!(flags.api_port, DEFAULT_API_PORT);
    }
}
