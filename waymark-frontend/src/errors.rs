use std::path::PathBuf;

use thiserror::Error;
use waymark_engine::errors::EngineError;
use waymark_io::IoError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("读取手势脚本 {path:?} 失败: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("手势脚本第 {line} 行无法解析: {message}")]
    ScriptSyntax { line: usize, message: String },
}
