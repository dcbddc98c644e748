pub mod cli;
pub mod errors;
pub mod loader;
pub mod resource_locator;

use std::fs;
use std::path::PathBuf;

use errors::FrontendError;
use tracing::info;
use waymark_config::{AppConfig, FrontendMode};
use waymark_engine::command::CommandBus;
use waymark_engine::editor::Editor;
use waymark_engine::tool::ToolDefaults;

use crate::loader::{load_scene_or_demo, scene_path};
use crate::resource_locator::{ImageLocator, probe_image_size};

/// 命令行覆盖项。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub mode: Option<FrontendMode>,
    pub scene: Option<PathBuf>,
    pub script: Option<PathBuf>,
}

/// 按配置组装编辑上下文，尚未载入场景。
pub fn build_editor(config: &AppConfig) -> Editor {
    let defaults = ToolDefaults {
        door_detail_level: config.editor.door_detail_level,
        hit_box: config.editor.hit_box(),
        ..ToolDefaults::default()
    };
    Editor::new(config.transform.settings(), defaults)
}

/// 运行 CLI 前端：加载场景、可选回放手势脚本，然后输出摘要或导出文本。
pub fn run_cli(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    info!("启动 CLI 前端");
    let mut editor = build_editor(config);

    let scene_file = scene_path(options.scene.as_deref());
    let base_dir = scene_file.as_deref().and_then(|path| path.parent());
    let locator = ImageLocator::from_config(base_dir, &config.resources);
    editor.set_image_size(probe_image_size(&locator, &config.resources));

    let mut loaded = load_scene_or_demo(scene_file.as_deref(), config, editor.transform()?);
    editor.load_scene(std::mem::take(&mut loaded.scene));

    if let Some(path) = &options.script {
        let script = fs::read_to_string(path).map_err(|source| FrontendError::ScriptRead {
            path: path.clone(),
            source,
        })?;
        let bus = CommandBus::new();
        let commands: Vec<&str> = bus.available_commands().copied().collect();
        info!(commands = commands.join(", "), "可用编辑命令");
        cli::run_script(&mut editor, &bus, &script)?;
    }

    match options.mode.unwrap_or(config.frontend.default_mode) {
        FrontendMode::Summary => {
            cli::print_summary(&editor, &loaded);
            Ok(())
        }
        FrontendMode::Export => cli::print_export(&editor),
    }
}
