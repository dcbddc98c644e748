use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};
use waymark_config::ResourceConfig;
use waymark_core::transform::ImageSize;

const IMAGE_ROOTS_ENV: &str = "WAYMARK_IMAGE_ROOTS";

/// 背景图查找器：依次在场景文件目录、配置的目录与环境变量目录中查找。
pub struct ImageLocator {
    search_roots: Vec<PathBuf>,
}

impl ImageLocator {
    pub fn from_config(base_dir: Option<&Path>, resources: &ResourceConfig) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        if let Some(dir) = base_dir {
            roots.push(dir.to_path_buf());
        }

        roots.extend(
            resources
                .image_roots
                .iter()
                .cloned()
                .filter(|path| path.is_dir()),
        );

        if let Some(env_paths) = env::var_os(IMAGE_ROOTS_ENV) {
            for path in env::split_paths(&env_paths) {
                if path.is_dir() {
                    roots.push(path);
                }
            }
        }

        // 去重，保持靠前优先级。
        let mut deduped: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !deduped.iter().any(|existing| existing == &root) {
                deduped.push(root);
            }
        }

        ImageLocator {
            search_roots: deduped,
        }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn resolve(&self, raw_path: &Path) -> Option<PathBuf> {
        if raw_path.is_absolute() {
            if raw_path.exists() {
                return Some(raw_path.to_path_buf());
            }
            debug!(path = %raw_path.display(), "背景图为绝对路径但未找到对应文件");
            return None;
        }
        self.search_roots
            .iter()
            .map(|root| root.join(raw_path))
            .inspect(|candidate| trace!(candidate = %candidate.display(), "背景图候选路径"))
            .find(|candidate| candidate.exists())
    }
}

/// 读取背景图文件头获取像素尺寸；未配置、找不到或无法识别时使用回退尺寸。
pub fn probe_image_size(locator: &ImageLocator, resources: &ResourceConfig) -> ImageSize {
    let fallback = resources.fallback_size();
    let Some(configured) = resources.background_image.as_deref() else {
        debug!(
            width = fallback.width,
            height = fallback.height,
            "未配置背景图，使用回退尺寸"
        );
        return fallback;
    };
    let Some(path) = locator.resolve(configured) else {
        warn!(path = %configured.display(), "找不到背景图，使用回退尺寸");
        return fallback;
    };
    match image::image_dimensions(&path) {
        Ok((width, height)) => {
            info!(path = %path.display(), width, height, "已读取背景图尺寸");
            ImageSize::new(width, height)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "无法读取背景图尺寸，使用回退尺寸");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reads_png_header_from_search_root() {
        let dir = tempfile::tempdir().expect("create temp dir");
        image::RgbImage::new(16, 9)
            .save(dir.path().join("floor.png"))
            .expect("write png");

        let resources = ResourceConfig {
            image_roots: vec![dir.path().to_path_buf()],
            background_image: Some(PathBuf::from("floor.png")),
            ..ResourceConfig::default()
        };
        let locator = ImageLocator::from_config(None, &resources);
        assert_eq!(probe_image_size(&locator, &resources), ImageSize::new(16, 9));
    }

    #[test]
    fn missing_or_unreadable_image_falls_back() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("broken.png"), b"not an image").expect("write file");

        let mut resources = ResourceConfig {
            background_image: Some(PathBuf::from("absent.png")),
            fallback_image_size: [320, 200],
            ..ResourceConfig::default()
        };
        let locator = ImageLocator::from_config(Some(dir.path()), &resources);
        assert_eq!(probe_image_size(&locator, &resources), ImageSize::new(320, 200));

        resources.background_image = Some(PathBuf::from("broken.png"));
        assert_eq!(probe_image_size(&locator, &resources), ImageSize::new(320, 200));

        resources.background_image = None;
        assert_eq!(probe_image_size(&locator, &resources), ImageSize::new(320, 200));
    }

    #[test]
    fn duplicate_roots_are_removed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let resources = ResourceConfig {
            image_roots: vec![dir.path().to_path_buf(), dir.path().to_path_buf()],
            ..ResourceConfig::default()
        };
        let locator = ImageLocator::from_config(Some(dir.path()), &resources);
        assert_eq!(
            locator
                .search_roots()
                .iter()
                .filter(|root| root.as_path() == dir.path())
                .count(),
            1
        );
    }
}
