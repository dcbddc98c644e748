use std::collections::HashMap;

use tracing::debug;
use waymark_core::entity::{DetailLevel, EntityId, EntityKind};

use crate::editor::Editor;
use crate::errors::EngineError;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// 按空白切分一行文本：首个词为命令名，其余为参数。
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?;
        Some(Self::new(name, words))
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<Result<String, EngineError>> for CommandResponse {
    fn from(result: Result<String, EngineError>) -> Self {
        match result {
            Ok(message) => CommandResponse::ok(message),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

/// 属性编辑面板调用的接缝：按名称分派的编辑命令。
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>)
    -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ClearSelectionCommand);
        bus.register(ResetGestureCommand);
        bus.register(DeleteCommand);
        bus.register(RenameCommand);
        bus.register(DescribeCommand);
        bus.register(SetNavigatableCommand);
        bus.register(SetDetailLevelCommand);
        bus.register(AddInsidePointCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            debug!(command = request.name.as_str(), args = ?request.args, "执行编辑命令");
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn arg<'r>(request: &'r CommandRequest, index: usize, what: &str) -> Result<&'r str, EngineError> {
    request
        .args
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| EngineError::InvalidArgument(format!("{} 缺少参数 {what}", request.name)))
}

fn id_arg(request: &CommandRequest) -> Result<EntityId, EngineError> {
    let raw = arg(request, 0, "<id>")?;
    raw.parse::<u64>()
        .map(EntityId::new)
        .map_err(|_| EngineError::InvalidArgument(format!("无法解析实体 ID: {raw}")))
}

/// 第一个参数之后的全部参数以空格拼接，允许名称中带空格。
fn text_arg(request: &CommandRequest) -> String {
    request.args.iter().skip(1).cloned().collect::<Vec<_>>().join(" ")
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.editor.tools_mut().clear_selection();
        CommandResponse::ok("选中项已清空")
    }
}

struct ResetGestureCommand;

impl CommandHandler for ResetGestureCommand {
    fn name(&self) -> &'static str {
        "reset_gesture"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.editor.tools_mut().reset_gesture();
        CommandResponse::ok("已取消进行中的手势")
    }
}

struct DeleteCommand;

impl CommandHandler for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let kind = context
                .editor
                .scene_mut()
                .delete(id)
                .ok_or(EngineError::EntityNotFound(id.get()))?;
            if context.editor.selected_id() == Some(id) {
                context.editor.tools_mut().clear_selection();
            }
            Ok(format!("已删除 {} #{id}", kind.tag()))
        });
        result.into()
    }
}

struct RenameCommand;

impl CommandHandler for RenameCommand {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let name = text_arg(request);
            let scene = context.editor.scene_mut();
            if let Some(waypoint) = scene.waypoint_mut(id) {
                waypoint.name = name.clone();
            } else if let Some(door) = scene.door_mut(id) {
                door.name = name.clone();
            } else {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            Ok(format!("#{id} 已重命名为 {name}"))
        });
        result.into()
    }
}

struct DescribeCommand;

impl CommandHandler for DescribeCommand {
    fn name(&self) -> &'static str {
        "describe"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let door = door_mut(context, id)?;
            door.description = text_arg(request);
            Ok(format!("门 #{id} 描述已更新"))
        });
        result.into()
    }
}

struct SetNavigatableCommand;

impl CommandHandler for SetNavigatableCommand {
    fn name(&self) -> &'static str {
        "set_navigatable"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let raw = arg(request, 1, "<true|false>")?;
            let navigatable = raw
                .parse::<bool>()
                .map_err(|_| EngineError::InvalidArgument(format!("无法解析布尔值: {raw}")))?;
            let waypoint = context.editor.scene_mut().waypoint_mut(id).ok_or(
                EngineError::WrongKind {
                    id: id.get(),
                    expected: EntityKind::Waypoint,
                },
            )?;
            waypoint.set_navigatable(navigatable);
            Ok(format!("路点 #{id} 可导航={navigatable}"))
        });
        result.into()
    }
}

struct SetDetailLevelCommand;

impl CommandHandler for SetDetailLevelCommand {
    fn name(&self) -> &'static str {
        "set_detail_level"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let raw = arg(request, 1, "<LOW|MEDIUM|HIGH>")?;
            let level = raw
                .parse::<DetailLevel>()
                .map_err(|err| EngineError::InvalidArgument(err.to_string()))?;
            let scene = context.editor.scene_mut();
            if let Some(waypoint) = scene.waypoint_mut(id) {
                if !waypoint.set_detail_level(level) {
                    return Err(EngineError::InvalidArgument(format!(
                        "路点 #{id} 不可导航，不能设置访问等级"
                    )));
                }
            } else if let Some(door) = scene.door_mut(id) {
                door.detail_level = level;
            } else {
                return Err(EngineError::EntityNotFound(id.get()));
            }
            Ok(format!("#{id} 访问等级={level}"))
        });
        result.into()
    }
}

struct AddInsidePointCommand;

impl CommandHandler for AddInsidePointCommand {
    fn name(&self) -> &'static str {
        "add_inside_point"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let result = id_arg(request).and_then(|id| {
            let door = door_mut(context, id)?;
            Ok(if door.add_inside_point() {
                format!("门 #{id} 已添加内侧点")
            } else {
                format!("门 #{id} 已有内侧点")
            })
        });
        result.into()
    }
}

fn door_mut<'c>(
    context: &'c mut CommandContext<'_>,
    id: EntityId,
) -> Result<&'c mut waymark_core::entity::Door, EngineError> {
    context
        .editor
        .scene_mut()
        .door_mut(id)
        .ok_or(EngineError::WrongKind {
            id: id.get(),
            expected: EntityKind::Door,
        })
}
