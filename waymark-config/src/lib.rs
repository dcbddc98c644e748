use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use waymark_core::entity::DetailLevel;
use waymark_core::geometry::{HitBox, Point2};
use waymark_core::transform::{DEFAULT_ORIGIN, DEFAULT_RESOLUTION, ImageSize, TransformSettings};

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `WAYMARK_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("WAYMARK_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 世界坐标换算常量。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "TransformConfig::default_resolution")]
    pub resolution: f64,
    #[serde(default = "TransformConfig::default_origin")]
    pub origin: [f64; 2],
}

impl TransformConfig {
    fn default_resolution() -> f64 {
        DEFAULT_RESOLUTION
    }

    fn default_origin() -> [f64; 2] {
        [DEFAULT_ORIGIN.0, DEFAULT_ORIGIN.1]
    }

    pub fn settings(&self) -> TransformSettings {
        TransformSettings::new(
            self.resolution,
            Point2::new(self.origin[0], self.origin[1]),
        )
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            resolution: Self::default_resolution(),
            origin: Self::default_origin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// 新建门的访问等级，取值 `low` / `medium` / `high`。
    #[serde(default)]
    pub door_detail_level: DetailLevel,
    #[serde(default = "EditorConfig::default_hit_box_size")]
    pub hit_box_size: f64,
}

impl EditorConfig {
    fn default_hit_box_size() -> f64 {
        HitBox::DEFAULT_SIZE
    }

    pub fn hit_box(&self) -> HitBox {
        HitBox::square(self.hit_box_size)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            door_detail_level: DetailLevel::default(),
            hit_box_size: Self::default_hit_box_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ImportConfig {
    /// 开启后导入遇到坏数据直接失败，而不是降级处理。
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub image_roots: Vec<PathBuf>,
    /// 背景图路径，相对路径按 `image_roots` 依次查找。
    #[serde(default)]
    pub background_image: Option<PathBuf>,
    /// 背景图缺失或无法读取时使用的尺寸 `[width, height]`。
    #[serde(default = "ResourceConfig::default_fallback_size")]
    pub fallback_image_size: [u32; 2],
}

impl ResourceConfig {
    fn default_fallback_size() -> [u32; 2] {
        [1000, 1000]
    }

    pub fn fallback_size(&self) -> ImageSize {
        ImageSize::new(self.fallback_image_size[0], self.fallback_image_size[1])
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            image_roots: Vec::new(),
            background_image: None,
            fallback_image_size: Self::default_fallback_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendMode {
    /// 打印场景摘要与绘制指令统计。
    #[default]
    Summary,
    /// 以文本格式输出整个场景。
    Export,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub default_mode: FrontendMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
