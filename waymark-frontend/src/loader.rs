use std::env;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use waymark_config::AppConfig;
use waymark_core::scene::{DemoEntities, Scene};
use waymark_core::transform::MapTransform;
use waymark_io::{ImportMode, ImportReport, TextFacade};

const SCENE_FILE_ENV: &str = "WAYMARK_SCENE_FILE";

/// 场景来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum SceneSource {
    File(PathBuf),
    Demo,
}

/// 统一封装加载后的场景与元信息。
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub source: SceneSource,
    pub report: Option<ImportReport>,
    pub demo_entities: Option<DemoEntities>,
}

impl LoadedScene {
    pub fn demo() -> Self {
        let mut scene = Scene::new();
        let demo_entities = scene.populate_demo();
        LoadedScene {
            scene,
            source: SceneSource::Demo,
            report: None,
            demo_entities: Some(demo_entities),
        }
    }
}

/// 场景文件路径：命令行参数优先，其次环境变量 `WAYMARK_SCENE_FILE`。
pub fn scene_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(SCENE_FILE_ENV).map(PathBuf::from))
}

/// 从文本场景文件加载，失败时回退到内置示例。
///
/// 文件中不保存命中框尺寸，两种来源的标记都统一使用 `[editor] hit_box_size`。
pub fn load_scene_or_demo(
    path: Option<&Path>,
    config: &AppConfig,
    transform: MapTransform,
) -> LoadedScene {
    let mut loaded = path
        .and_then(|path| load_file(path, config, transform))
        .unwrap_or_else(LoadedScene::demo);
    loaded.scene.apply_hit_box(config.editor.hit_box());
    loaded
}

fn load_file(path: &Path, config: &AppConfig, transform: MapTransform) -> Option<LoadedScene> {
    let facade =
        TextFacade::new(transform).with_mode(ImportMode::from_strict(config.import.strict));
    let mut scene = Scene::new();
    match facade.import_file(&mut scene, path) {
        Ok(report) => {
            info!(path = %path.display(), "从文本文件加载场景成功");
            Some(LoadedScene {
                scene,
                source: SceneSource::File(path.to_path_buf()),
                report: Some(report),
                demo_entities: None,
            })
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "加载场景文件失败，回退到内置示例");
            None
        }
    }
}
