use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use waymark_core::{
    entity::{DetailLevel, Door, EntityId, EntityKind, Waypoint},
    geometry::Point2,
    scene::Scene,
    transform::MapTransform,
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },
}

/// 导入策略。默认宽松：坏数据降级处理而不是报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    #[default]
    Lenient,
    /// 遇到无法解析的数值、未知记录、缺失字段或无法解析的引用即失败。
    Strict,
}

impl ImportMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            ImportMode::Strict
        } else {
            ImportMode::Lenient
        }
    }
}

/// 一次导入的统计结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportReport {
    pub doors: usize,
    pub waypoints: usize,
    /// 未能解析（含前向引用）而被丢弃的连接与门引用数。
    pub unresolved_references: usize,
    pub skipped_lines: usize,
}

pub trait SceneLoader {
    fn load(&self, path: &Path) -> Result<Scene, IoError>;
}

pub trait SceneSaver {
    fn save(&self, scene: &Scene, path: &Path) -> Result<(), IoError>;
}

/// 基于文本格式的文件读写入口。
pub struct TextFacade {
    transform: MapTransform,
    mode: ImportMode,
}

impl TextFacade {
    pub fn new(transform: MapTransform) -> Self {
        Self {
            transform,
            mode: ImportMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    /// 把文件内容合并进已有场景。
    pub fn import_file(&self, scene: &mut Scene, path: &Path) -> Result<ImportReport, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        decode_into(scene, &data, &self.transform, self.mode)
    }
}

impl SceneLoader for TextFacade {
    fn load(&self, path: &Path) -> Result<Scene, IoError> {
        let mut scene = Scene::new();
        self.import_file(&mut scene, path)?;
        Ok(scene)
    }
}

impl SceneSaver for TextFacade {
    fn save(&self, scene: &Scene, path: &Path) -> Result<(), IoError> {
        let mut text = encode(scene, &self.transform);
        text.push('\n');
        fs::write(path, text).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 导出整个场景：先全部门，再全部路点，每行一条记录。
pub fn encode(scene: &Scene, transform: &MapTransform) -> String {
    scene
        .doors()
        .map(|door| door.export(transform))
        .chain(scene.waypoints().map(|waypoint| waypoint.export(transform)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decode(
    text: &str,
    transform: &MapTransform,
    mode: ImportMode,
) -> Result<(Scene, ImportReport), IoError> {
    let mut scene = Scene::new();
    let report = decode_into(&mut scene, text, transform, mode)?;
    Ok((scene, report))
}

/// 按文件顺序逐行导入并合并到 `scene`。
///
/// 路点记录中的引用只能指向此前已导入的实体，指向后续记录的引用会被丢弃。
/// 严格模式下出错时 `scene` 保持原样。
pub fn decode_into(
    scene: &mut Scene,
    text: &str,
    transform: &MapTransform,
    mode: ImportMode,
) -> Result<ImportReport, IoError> {
    let mut importer = Importer {
        scene: scene.clone(),
        transform,
        mode,
        report: ImportReport::default(),
        max_id: None,
    };
    for (index, line) in text.lines().enumerate() {
        importer.import_line(index + 1, line)?;
    }

    let Importer {
        scene: staged,
        report,
        max_id,
        ..
    } = importer;
    let was_empty = scene.is_empty();
    let prior_counter = scene.id_counter();
    *scene = staged;
    if let Some(next) = max_id.and_then(|max| max.checked_add(1)) {
        scene.set_id_counter(if was_empty {
            next
        } else {
            next.max(prior_counter)
        });
    }

    if report.unresolved_references > 0 || report.skipped_lines > 0 {
        warn!(
            unresolved = report.unresolved_references,
            skipped = report.skipped_lines,
            "导入时丢弃了部分数据"
        );
    }
    info!(
        doors = report.doors,
        waypoints = report.waypoints,
        next_id = scene.id_counter(),
        "场景导入完成"
    );
    Ok(report)
}

struct Importer<'t> {
    scene: Scene,
    transform: &'t MapTransform,
    mode: ImportMode,
    report: ImportReport,
    max_id: Option<u64>,
}

impl Importer<'_> {
    fn import_line(&mut self, line_number: usize, line: &str) -> Result<(), IoError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let mut record = RecordFields::new(line, line_number, self.mode);
        match record.next_str("tag")? {
            "Door" => self.import_door(record),
            "Waypoint" => self.import_waypoint(record),
            other => self.skip(line_number, format!("未知记录类型 \"{other}\"")),
        }
    }

    fn import_door(&mut self, mut record: RecordFields<'_>) -> Result<(), IoError> {
        let Some(id) = record.next_id("id")? else {
            return self.skip(record.line, "门记录的 ID 无法解析".to_string());
        };
        if id == EntityId::RESERVED {
            return self.skip(record.line, format!("门记录的 ID {id} 超出可分配范围"));
        }
        let name = record.next_str("name")?;
        let description = record.next_str("description")?;
        let level = record.next_level()?;
        let entrance = record.next_point(self.transform)?;
        let inside = if record.next_bool("hasInside")? {
            Some(record.next_point(self.transform)?)
        } else {
            None
        };

        self.claim_id(id, EntityKind::Door, record.line)?;
        let mut door = Door::new(id, name, description, entrance, level);
        door.inside_point = inside;
        self.scene.insert_door(door);
        self.report.doors += 1;
        debug!(line = record.line, id = id.get(), "导入门");
        Ok(())
    }

    fn import_waypoint(&mut self, mut record: RecordFields<'_>) -> Result<(), IoError> {
        let Some(id) = record.next_id("id")? else {
            return self.skip(record.line, "路点记录的 ID 无法解析".to_string());
        };
        if id == EntityId::RESERVED {
            return self.skip(record.line, format!("路点记录的 ID {id} 超出可分配范围"));
        }
        let name = record.next_str("name")?;
        let point = record.next_point(self.transform)?;
        let connections = record.next_id_list("connections")?;
        let doors = record.next_id_list("doors")?;
        let navigatable = record.next_bool("navigatable")?;
        let level = if navigatable {
            record.next_optional_level()?
        } else {
            None
        };

        self.claim_id(id, EntityKind::Waypoint, record.line)?;
        // 同一 ID 再次出现时以新记录为准，先拆掉旧记录的边。
        if let Some(previous) = self.scene.waypoint(id) {
            let stale = previous.connections.clone();
            for other in stale {
                self.scene.disconnect_waypoints(id, other);
            }
        }

        let mut waypoint = Waypoint::new(id, name, point);
        waypoint.set_navigation(navigatable, level);

        // 自身尚未插入，自引用与前向引用一样无法解析。
        let mut linked = Vec::new();
        for reference in connections {
            match reference {
                Some(other) if other != id && self.scene.waypoint(other).is_some() => {
                    linked.push(other);
                }
                _ => self.unresolved(record.line, reference)?,
            }
        }
        for reference in doors {
            match reference {
                Some(door) if self.scene.door(door).is_some() => {
                    if !waypoint.doors.contains(&door) {
                        waypoint.doors.push(door);
                    }
                }
                _ => self.unresolved(record.line, reference)?,
            }
        }

        self.scene.insert_waypoint(waypoint);
        for other in linked {
            self.scene.connect_waypoints(id, other);
        }
        self.report.waypoints += 1;
        debug!(line = record.line, id = id.get(), "导入路点");
        Ok(())
    }

    fn claim_id(&mut self, id: EntityId, kind: EntityKind, line: usize) -> Result<(), IoError> {
        self.max_id = Some(self.max_id.map_or(id.get(), |max| max.max(id.get())));
        let clash = match kind {
            EntityKind::Waypoint => self.scene.door(id).is_some(),
            EntityKind::Door => self.scene.waypoint(id).is_some(),
        };
        if clash {
            if self.mode == ImportMode::Strict {
                return Err(IoError::InvalidRecord {
                    line,
                    message: format!("ID {id} 已被另一种实体占用"),
                });
            }
            warn!(line, id = id.get(), kind = kind.tag(), "ID 与另一种实体冲突，以后出现的记录为准");
            self.scene.delete(id);
        }
        Ok(())
    }

    fn unresolved(&mut self, line: usize, reference: Option<EntityId>) -> Result<(), IoError> {
        let message = match reference {
            Some(id) => format!("引用的实体 {id} 不存在或尚未导入"),
            None => "引用 ID 无法解析".to_string(),
        };
        if self.mode == ImportMode::Strict {
            return Err(IoError::InvalidRecord { line, message });
        }
        debug!(line, %message, "丢弃无法解析的引用");
        self.report.unresolved_references += 1;
        Ok(())
    }

    fn skip(&mut self, line: usize, message: String) -> Result<(), IoError> {
        if self.mode == ImportMode::Strict {
            return Err(IoError::InvalidRecord { line, message });
        }
        warn!(line, %message, "跳过无法导入的行");
        self.report.skipped_lines += 1;
        Ok(())
    }
}

/// 单条记录的字段游标。宽松模式下坏字段降级为默认值，严格模式下直接报错。
struct RecordFields<'a> {
    fields: std::str::Split<'a, char>,
    line: usize,
    mode: ImportMode,
}

impl<'a> RecordFields<'a> {
    fn new(record: &'a str, line: usize, mode: ImportMode) -> Self {
        Self {
            fields: record.split(','),
            line,
            mode,
        }
    }

    fn strict(&self) -> bool {
        self.mode == ImportMode::Strict
    }

    fn invalid(&self, message: String) -> IoError {
        IoError::InvalidRecord {
            line: self.line,
            message,
        }
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        self.fields.next().map(str::trim)
    }

    fn missing(&self, what: &str) -> Result<(), IoError> {
        if self.strict() {
            Err(self.invalid(format!("缺少字段 {what}")))
        } else {
            Ok(())
        }
    }

    fn next_str(&mut self, what: &str) -> Result<&'a str, IoError> {
        match self.next_raw() {
            Some(raw) => Ok(raw),
            None => self.missing(what).map(|_| ""),
        }
    }

    /// 宽松模式下无法解析的数值记为 NaN 继续传播。
    fn next_f64(&mut self, what: &str) -> Result<f64, IoError> {
        let Some(raw) = self.next_raw() else {
            return self.missing(what).map(|_| f64::NAN);
        };
        match raw.parse::<f64>() {
            Ok(value) => Ok(value),
            Err(_) if self.strict() => Err(self.invalid(format!("{what} 不是数值: \"{raw}\""))),
            Err(_) => Ok(f64::NAN),
        }
    }

    /// 读取世界坐标并换算为屏幕坐标。
    fn next_point(&mut self, transform: &MapTransform) -> Result<Point2, IoError> {
        let x = self.next_f64("x")?;
        let y = self.next_f64("y")?;
        Ok(transform.to_screen(Point2::new(x, y)))
    }

    fn next_count(&mut self, what: &str) -> Result<usize, IoError> {
        let Some(raw) = self.next_raw() else {
            return self.missing(what).map(|_| 0);
        };
        match raw.parse::<usize>() {
            Ok(count) => Ok(count),
            Err(_) if self.strict() => Err(self.invalid(format!("{what} 数量无法解析: \"{raw}\""))),
            Err(_) => Ok(0),
        }
    }

    fn parse_id(&self, raw: &str, what: &str) -> Result<Option<EntityId>, IoError> {
        match raw.parse::<u64>() {
            Ok(id) => Ok(Some(EntityId::new(id))),
            Err(_) if self.strict() => Err(self.invalid(format!("{what} 不是合法 ID: \"{raw}\""))),
            Err(_) => Ok(None),
        }
    }

    fn next_id(&mut self, what: &str) -> Result<Option<EntityId>, IoError> {
        match self.next_raw() {
            Some(raw) => self.parse_id(raw, what),
            None => self.missing(what).map(|_| None),
        }
    }

    /// `<count>,<id>*`；字段提前耗尽时停止读取。
    fn next_id_list(&mut self, what: &str) -> Result<Vec<Option<EntityId>>, IoError> {
        let count = self.next_count(what)?;
        let mut ids = Vec::new();
        for _ in 0..count {
            let Some(raw) = self.next_raw() else {
                self.missing(what)?;
                break;
            };
            ids.push(self.parse_id(raw, what)?);
        }
        Ok(ids)
    }

    fn next_bool(&mut self, what: &str) -> Result<bool, IoError> {
        let Some(raw) = self.next_raw() else {
            return self.missing(what).map(|_| false);
        };
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            other if self.strict() => Err(self.invalid(format!("{what} 不是布尔值: \"{other}\""))),
            _ => Ok(false),
        }
    }

    fn parse_level(&self, raw: &str) -> Result<DetailLevel, IoError> {
        if self.strict() {
            raw.parse::<DetailLevel>()
                .map_err(|err| self.invalid(err.to_string()))
        } else {
            Ok(DetailLevel::parse_lenient(Some(raw)))
        }
    }

    fn next_level(&mut self) -> Result<DetailLevel, IoError> {
        match self.next_raw() {
            Some(raw) => self.parse_level(raw),
            None => self.missing("detailLevel").map(|_| DetailLevel::High),
        }
    }

    /// 路点末尾的访问等级可以缺省。
    fn next_optional_level(&mut self) -> Result<Option<DetailLevel>, IoError> {
        match self.next_raw() {
            Some(raw) => self.parse_level(raw).map(Some),
            None => Ok(None),
        }
    }
}
