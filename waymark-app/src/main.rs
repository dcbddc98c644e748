use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use waymark_config::{AppConfig, ConfigError, FrontendMode};
use waymark_frontend::CliOptions;

const LOG_ENV: &str = "WAYMARK_LOG";

const USAGE: &str = "用法: waymark-app [--summary | --export] [--config <文件>] [--scene <文件>] [--script <文件>]";

/// 一次命令行调用：前端选项加上可选的配置文件路径。
#[derive(Debug, Default)]
struct Invocation {
    options: CliOptions,
    config_path: Option<PathBuf>,
    show_help: bool,
}

fn main() -> ExitCode {
    let invocation = match parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    if invocation.show_help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let (config, config_error) = load_configuration(invocation.config_path.as_deref());
    init_logging(&config.logging.level);
    // 日志初始化之前无法输出，配置问题推迟到这里报告
    if let Some(err) = config_error {
        warn!(error = %err, "配置加载失败，使用内建默认值");
    }
    info!(mode = ?invocation.options.mode, "启动 Waymark 标注工具");

    match waymark_frontend::run_cli(&config, &invocation.options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "执行 CLI 前端失败");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation, String> {
    let mut invocation = Invocation::default();
    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        let slot = match flag.as_str() {
            "--summary" => {
                invocation.options.mode = Some(FrontendMode::Summary);
                continue;
            }
            "--export" => {
                invocation.options.mode = Some(FrontendMode::Export);
                continue;
            }
            "-h" | "--help" => {
                invocation.show_help = true;
                continue;
            }
            "--config" => &mut invocation.config_path,
            "--scene" => &mut invocation.options.scene,
            "--script" => &mut invocation.options.script,
            other => return Err(format!("未知参数：{other}")),
        };
        let value = args
            .next()
            .ok_or_else(|| format!("`{flag}` 需要提供文件路径"))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(invocation)
}

/// 显式路径优先，否则走自动发现；失败时返回默认配置和错误，由调用方决定如何报告。
fn load_configuration(explicit: Option<&Path>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match explicit {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

/// `WAYMARK_LOG` 覆盖配置中的日志级别；日志写到 stderr，导出内容独占 stdout。
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_mode_and_paths() {
        let invocation = parse_args(args(&[
            "--export",
            "--scene",
            "floor.txt",
            "--script",
            "gestures.txt",
            "--config",
            "custom.toml",
        ]))
        .expect("参数应能解析");

        assert_eq!(invocation.options.mode, Some(FrontendMode::Export));
        assert_eq!(invocation.options.scene, Some(PathBuf::from("floor.txt")));
        assert_eq!(invocation.options.script, Some(PathBuf::from("gestures.txt")));
        assert_eq!(invocation.config_path, Some(PathBuf::from("custom.toml")));
        assert!(!invocation.show_help);
    }

    #[test]
    fn later_mode_flag_wins() {
        let invocation = parse_args(args(&["--export", "--summary"])).expect("参数应能解析");
        assert_eq!(invocation.options.mode, Some(FrontendMode::Summary));
    }

    #[test]
    fn rejects_unknown_flag_and_missing_value() {
        let err = parse_args(args(&["--verbose"])).unwrap_err();
        assert!(err.contains("--verbose"), "{err}");

        let err = parse_args(args(&["--scene"])).unwrap_err();
        assert!(err.contains("--scene"), "{err}");
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("absent.toml");
        let (config, err) = load_configuration(Some(path.as_path()));
        assert!(matches!(err, Some(ConfigError::Io { .. })));
        assert_eq!(config.logging.level, AppConfig::default().logging.level);
    }
}
