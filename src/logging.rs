//! # Logging モジュール
//!
//! 照準補助シミュレーションのログ管理機能を提供します。
//!
//! tracing-appenderによる非同期ファイル出力と、コンソール出力を
//! 設定に応じて組み合わせます。ティック単位の詳細イベント（マウス移動、射撃制限）は
//! TRACE/DEBUGレベルで出力されるため、通常はINFOで実行してください。
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（logs/aimsim.YYYY-MM-DD、JSON形式）
//! - `Both`: コンソールとファイルの両方

use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Registry,
};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl LogOutput {
    fn writes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }

    fn writes_console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル（環境変数 `RUST_LOG` があればそちらを優先）
    pub level: Level,
    /// 出力先
    pub output: LogOutput,
    /// ログファイルのディレクトリ（Fileまたは Bothの場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "aimsim".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// # 引数
///
/// * `config` - ログ設定
///
/// # 戻り値
///
/// ファイル出力を行う場合は非同期書き込みのガード。プログラム終了まで
/// 保持しないと未書き込みのログが失われます。
///
/// # 例
///
/// ```no_run
/// use aimsim::logging::{LogConfig, LogOutput, init_logging};
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     output: LogOutput::Both,
///     ..LogConfig::default()
/// };
///
/// let _guard = init_logging(config)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    // 環境変数またはconfigからログレベルを設定
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.output.writes_console().then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    let (file_layer, guard) = if config.output.writes_file() {
        ensure_log_directory(&config.log_dir)?;
        let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (non_blocking_appender, guard) = non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベルを文字列から解析
///
/// # 引数
///
/// * `level_str` - ログレベル文字列 ("trace", "debug", "info", "warn", "error")
///
/// # 戻り値
///
/// 解析されたログレベル、無効な場合はINFO
pub fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
            Level::INFO
        }
    }
}

/// `-v` の指定回数からログレベルを決定
///
/// 明示的な `--log-level` が無い場合に使用します。
pub fn level_from_verbosity(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::INFO,
        1 | 2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_from_str() {
        assert_eq!(LogOutput::from_str("console"), Ok(LogOutput::Console));
        assert_eq!(LogOutput::from_str("FILE"), Ok(LogOutput::File));
        assert_eq!(LogOutput::from_str("all"), Ok(LogOutput::Both));
        assert!(LogOutput::from_str("invalid").is_err());
    }

    #[test]
    fn test_output_targets() {
        assert!(LogOutput::Both.writes_console() && LogOutput::Both.writes_file());
        assert!(!LogOutput::Console.writes_file());
        assert!(!LogOutput::File.writes_console());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("INFO"), Level::INFO);
        assert_eq!(parse_log_level("invalid"), Level::INFO);
    }

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::INFO);
        assert_eq!(level_from_verbosity(2), Level::DEBUG);
        assert_eq!(level_from_verbosity(5), Level::TRACE);
    }

    #[test]
    fn test_default_prefix() {
        let config = LogConfig::default();
        assert_eq!(config.file_prefix, "aimsim");
        assert_eq!(config.output, LogOutput::Console);
    }
}
