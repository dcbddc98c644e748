use std::fmt::Write as _;

use tracing::{debug, info, warn};
use waymark_core::entity::EntityRef;
use waymark_core::geometry::{Point2, Vector2};
use waymark_engine::command::{CommandBus, CommandContext, CommandRequest};
use waymark_engine::editor::Editor;
use waymark_engine::render::DrawCommand;
use waymark_engine::tool::{AddMode, EditorEvent, PointerEvent, Tool};
use waymark_io::encode;

use crate::errors::FrontendError;
use crate::loader::{LoadedScene, SceneSource};

/// 手势脚本的执行统计。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub gestures: usize,
    pub commands: usize,
    pub failed_commands: usize,
    pub scene_changes: usize,
}

/// 逐行回放手势脚本，驱动工具状态机与编辑命令。
///
/// 支持的指令：`tool <pan|add|select|remove|connect>`、`mode <waypoint|door|feature>`、
/// `click <x> <y>`、`drag <x1> <y1> <x2> <y2>`、`cmd <命令行>`、`reset`；`#` 开头为注释。
/// 坐标为画布坐标，执行前扣除平移偏移。
pub fn run_script(
    editor: &mut Editor,
    bus: &CommandBus,
    script: &str,
) -> Result<ScriptOutcome, FrontendError> {
    let mut outcome = ScriptOutcome::default();
    for (index, raw) in script.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_number = index + 1;
        let syntax = |message: String| FrontendError::ScriptSyntax {
            line: line_number,
            message,
        };
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match verb {
            "tool" => editor.set_tool(parse_tool(rest.trim()).ok_or_else(|| syntax(format!("未知工具 {rest}")))?),
            "mode" => editor.set_add_mode(
                parse_add_mode(rest.trim()).ok_or_else(|| syntax(format!("未知添加模式 {rest}")))?,
            ),
            "reset" => editor.tools_mut().reset_gesture(),
            "click" => {
                let [x, y] = parse_numbers::<2>(rest).ok_or_else(|| syntax("click 需要两个坐标".to_string()))?;
                let position = editor.to_map_local(Point2::new(x, y));
                let mut events = editor.handle_pointer(PointerEvent::Down { position });
                events.extend(editor.handle_pointer(PointerEvent::Up { position }));
                outcome.gestures += 1;
                outcome.scene_changes += count_changes(&events);
            }
            "drag" => {
                let [x1, y1, x2, y2] =
                    parse_numbers::<4>(rest).ok_or_else(|| syntax("drag 需要四个坐标".to_string()))?;
                let start = editor.to_map_local(Point2::new(x1, y1));
                let end = editor.to_map_local(Point2::new(x2, y2));
                let mut events = editor.handle_pointer(PointerEvent::Down { position: start });
                events.extend(editor.handle_pointer(PointerEvent::Move {
                    position: end,
                    delta: Vector2::from_points(start, end),
                }));
                // 平移会改变画布到地图的换算，抬起位置按新的偏移重新计算。
                let release = editor.to_map_local(Point2::new(x2, y2));
                events.extend(editor.handle_pointer(PointerEvent::Up { position: release }));
                outcome.gestures += 1;
                outcome.scene_changes += count_changes(&events);
            }
            "cmd" => {
                let request = CommandRequest::parse(rest).ok_or_else(|| syntax("cmd 缺少命令名".to_string()))?;
                let mut context = CommandContext { editor: &mut *editor };
                let response = bus.dispatch(&request, &mut context);
                outcome.commands += 1;
                if response.success {
                    debug!(command = request.name.as_str(), message = ?response.message, "脚本命令执行成功");
                } else {
                    outcome.failed_commands += 1;
                    warn!(line = line_number, message = ?response.message, "脚本命令执行失败");
                }
            }
            other => return Err(syntax(format!("未知指令 {other}"))),
        }
    }
    info!(
        gestures = outcome.gestures,
        commands = outcome.commands,
        "手势脚本回放完成"
    );
    Ok(outcome)
}

fn parse_tool(raw: &str) -> Option<Tool> {
    match raw {
        "pan" => Some(Tool::Pan),
        "add" => Some(Tool::Add),
        "select" => Some(Tool::Select),
        "remove" => Some(Tool::Remove),
        "connect" => Some(Tool::Connect),
        _ => None,
    }
}

fn parse_add_mode(raw: &str) -> Option<AddMode> {
    match raw {
        "waypoint" => Some(AddMode::Waypoint),
        "door" => Some(AddMode::Door),
        "feature" => Some(AddMode::Feature),
        _ => None,
    }
}

fn parse_numbers<const N: usize>(raw: &str) -> Option<[f64; N]> {
    let mut values = [0.0; N];
    let mut words = raw.split_whitespace();
    for value in &mut values {
        *value = words.next()?.parse().ok()?;
    }
    words.next().is_none().then_some(values)
}

fn count_changes(events: &[EditorEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, EditorEvent::SceneChanged))
        .count()
}

/// 生成场景概览文本。
pub fn summary(editor: &Editor, loaded_from: &SceneSource) -> String {
    let mut out = String::new();
    let scene = editor.scene();
    let _ = writeln!(out, "Waymark 标注场景");
    match loaded_from {
        SceneSource::File(path) => {
            let _ = writeln!(out, "已从文本文件加载：{}", path.display());
        }
        SceneSource::Demo => {
            let _ = writeln!(out, "使用内置示例场景");
        }
    }
    if let Some(size) = editor.image_size() {
        let _ = writeln!(out, "背景图尺寸 {}x{}", size.width, size.height);
    }
    let _ = writeln!(
        out,
        "路点 {} 个，门 {} 个，下一个 ID = {}",
        scene.waypoints().count(),
        scene.doors().count(),
        scene.id_counter()
    );

    for entity in scene.entities() {
        match entity {
            EntityRef::Waypoint(waypoint) => {
                let links: Vec<String> = waypoint.connections.iter().map(ToString::to_string).collect();
                let doors: Vec<String> = waypoint.doors.iter().map(ToString::to_string).collect();
                let _ = writeln!(
                    out,
                    "  - 路点 #{} {}，位置=({:.2}, {:.2})，连接=[{}]，门=[{}]，可导航={}{}",
                    waypoint.id,
                    waypoint.name,
                    waypoint.point.x(),
                    waypoint.point.y(),
                    links.join(", "),
                    doors.join(", "),
                    if waypoint.navigatable() { "是" } else { "否" },
                    waypoint
                        .detail_level()
                        .map(|level| format!("，访问等级={level}"))
                        .unwrap_or_default()
                );
            }
            EntityRef::Door(door) => {
                let inside = door
                    .inside_point
                    .map(|p| format!("({:.2}, {:.2})", p.x(), p.y()))
                    .unwrap_or_else(|| "无".to_string());
                let _ = writeln!(
                    out,
                    "  - 门 #{} {}（{}），入口=({:.2}, {:.2})，内侧点={}，访问等级={}",
                    door.id,
                    door.name,
                    door.description,
                    door.entrance_point.x(),
                    door.entrance_point.y(),
                    inside,
                    door.detail_level
                );
            }
        }
    }

    let asymmetric = scene.check_symmetry();
    if !asymmetric.is_empty() {
        let _ = writeln!(out, "警告：存在 {} 条单向连接", asymmetric.len());
    }

    let draw_list = editor.draw_list();
    let lines = draw_list
        .iter()
        .filter(|command| matches!(command, DrawCommand::Line { .. }))
        .count();
    let _ = writeln!(out, "绘制指令 {} 条，其中连线 {} 条", draw_list.len(), lines);
    out
}

/// 打印场景概览。
pub fn print_summary(editor: &Editor, loaded: &LoadedScene) {
    print!("{}", summary(editor, &loaded.source));
    if let Some(report) = &loaded.report {
        println!(
            "导入统计：门 {}，路点 {}，丢弃引用 {}，跳过行 {}",
            report.doors, report.waypoints, report.unresolved_references, report.skipped_lines
        );
    }
}

/// 以文本格式输出整个场景。
pub fn print_export(editor: &Editor) -> Result<(), FrontendError> {
    let transform = editor.transform()?;
    println!("{}", encode(editor.scene(), &transform));
    Ok(())
}
