use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{HitBox, Point2, Vector2};
use crate::transform::MapTransform;

/// 两类标记共用的 ID 空间中的一个值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// 保留值：计数器的饱和上限，导入时拒绝以此为 ID 的记录。
    pub const RESERVED: EntityId = EntityId(u64::MAX);

    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于序列化或日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Waypoint,
    Door,
}

impl EntityKind {
    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::Waypoint => "Waypoint",
            EntityKind::Door => "Door",
        }
    }
}

/// 访问等级，按 LOW < MEDIUM < HIGH 排序。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Low => "LOW",
            DetailLevel::Medium => "MEDIUM",
            DetailLevel::High => "HIGH",
        }
    }

    /// 宽松解析：除 `LOW` / `MEDIUM` 以外的任何取值（含缺失）都视为 `HIGH`。
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("LOW") => DetailLevel::Low,
            Some("MEDIUM") => DetailLevel::Medium,
            _ => DetailLevel::High,
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown detail level `{0}`")]
pub struct UnknownDetailLevel(pub String);

impl FromStr for DetailLevel {
    type Err = UnknownDetailLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(DetailLevel::Low),
            "MEDIUM" => Ok(DetailLevel::Medium),
            "HIGH" => Ok(DetailLevel::High),
            other => Err(UnknownDetailLevel(other.to_string())),
        }
    }
}

/// 命中测试返回的"具体是哪个点"，调用方据此直接拖拽该点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointSlot {
    Waypoint,
    Entrance,
    Inside,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: EntityId,
    pub name: String,
    pub point: Point2,
    /// 无向邻接：由 `Scene` 保证双方列表对称。
    pub connections: Vec<EntityId>,
    /// 可到达的门，单向关联。
    pub doors: Vec<EntityId>,
    navigatable: bool,
    detail_level: Option<DetailLevel>,
    pub hit_box: HitBox,
}

impl Waypoint {
    pub fn new(id: EntityId, name: impl Into<String>, point: Point2) -> Self {
        Self {
            id,
            name: name.into(),
            point,
            connections: Vec::new(),
            doors: Vec::new(),
            navigatable: false,
            detail_level: None,
            hit_box: HitBox::default(),
        }
    }

    #[inline]
    pub fn navigatable(&self) -> bool {
        self.navigatable
    }

    #[inline]
    pub fn detail_level(&self) -> Option<DetailLevel> {
        self.detail_level
    }

    /// 开启导航时默认使用 `HIGH`，关闭时清除访问等级。
    pub fn set_navigatable(&mut self, navigatable: bool) {
        self.set_navigation(navigatable, None);
    }

    /// 同时设置导航标记与访问等级，保持两者一致。
    pub fn set_navigation(&mut self, navigatable: bool, level: Option<DetailLevel>) {
        self.navigatable = navigatable;
        self.detail_level = if navigatable {
            Some(level.or(self.detail_level).unwrap_or_default())
        } else {
            None
        };
    }

    /// 仅在可导航时生效，返回是否已应用。
    pub fn set_detail_level(&mut self, level: DetailLevel) -> bool {
        if self.navigatable {
            self.detail_level = Some(level);
            true
        } else {
            false
        }
    }

    pub fn check_bounds(&self, query: Point2) -> Option<PointSlot> {
        self.hit_box
            .contains(self.point, query)
            .then_some(PointSlot::Waypoint)
    }

    pub fn export(&self, transform: &MapTransform) -> String {
        let world = transform.to_world(self.point);
        let mut fields: Vec<String> = vec![
            EntityKind::Waypoint.tag().to_string(),
            self.id.to_string(),
            self.name.clone(),
            world.x().to_string(),
            world.y().to_string(),
            self.connections.len().to_string(),
        ];
        fields.extend(self.connections.iter().map(ToString::to_string));
        fields.push(self.doors.len().to_string());
        fields.extend(self.doors.iter().map(ToString::to_string));
        fields.push(self.navigatable.to_string());
        if self.navigatable {
            if let Some(level) = self.detail_level {
                fields.push(level.as_str().to_string());
            }
        }
        fields.join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub entrance_point: Point2,
    pub inside_point: Option<Point2>,
    pub detail_level: DetailLevel,
    pub hit_box: HitBox,
}

impl Door {
    /// 新建内侧点时相对入口点的偏移。
    pub const INSIDE_OFFSET: Vector2 = Vector2(glam::DVec2::new(10.0, 0.0));

    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        description: impl Into<String>,
        entrance_point: Point2,
        detail_level: DetailLevel,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            entrance_point,
            inside_point: None,
            detail_level,
            hit_box: HitBox::default(),
        }
    }

    /// 按需创建内侧点，已存在时保持不变。返回是否新建。
    pub fn add_inside_point(&mut self) -> bool {
        if self.inside_point.is_some() {
            return false;
        }
        self.inside_point = Some(self.entrance_point.translate(Self::INSIDE_OFFSET));
        true
    }

    /// 入口点优先于内侧点。
    pub fn check_bounds(&self, query: Point2) -> Option<PointSlot> {
        if self.hit_box.contains(self.entrance_point, query) {
            return Some(PointSlot::Entrance);
        }
        match self.inside_point {
            Some(inside) if self.hit_box.contains(inside, query) => Some(PointSlot::Inside),
            _ => None,
        }
    }

    pub fn export(&self, transform: &MapTransform) -> String {
        let entrance = transform.to_world(self.entrance_point);
        let mut fields: Vec<String> = vec![
            EntityKind::Door.tag().to_string(),
            self.id.to_string(),
            self.name.clone(),
            self.description.clone(),
            self.detail_level.as_str().to_string(),
            entrance.x().to_string(),
            entrance.y().to_string(),
        ];
        match self.inside_point {
            Some(inside) => {
                let inside = transform.to_world(inside);
                fields.push("true".to_string());
                fields.push(inside.x().to_string());
                fields.push(inside.y().to_string());
            }
            None => fields.push("false".to_string()),
        }
        fields.join(",")
    }
}

/// 对两种标记的只读借用，按变体匹配分派公共能力。
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Waypoint(&'a Waypoint),
    Door(&'a Door),
}

impl<'a> EntityRef<'a> {
    #[inline]
    pub fn id(self) -> EntityId {
        match self {
            EntityRef::Waypoint(waypoint) => waypoint.id,
            EntityRef::Door(door) => door.id,
        }
    }

    #[inline]
    pub fn kind(self) -> EntityKind {
        match self {
            EntityRef::Waypoint(_) => EntityKind::Waypoint,
            EntityRef::Door(_) => EntityKind::Door,
        }
    }

    #[inline]
    pub fn name(self) -> &'a str {
        match self {
            EntityRef::Waypoint(waypoint) => &waypoint.name,
            EntityRef::Door(door) => &door.name,
        }
    }

    pub fn check_bounds(self, query: Point2) -> Option<PointSlot> {
        match self {
            EntityRef::Waypoint(waypoint) => waypoint.check_bounds(query),
            EntityRef::Door(door) => door.check_bounds(query),
        }
    }

    pub fn export(self, transform: &MapTransform) -> String {
        match self {
            EntityRef::Waypoint(waypoint) => waypoint.export(transform),
            EntityRef::Door(door) => door.export(transform),
        }
    }
}
