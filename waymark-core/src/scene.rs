use serde::{Deserialize, Serialize};

use crate::entity::{DetailLevel, Door, EntityId, EntityKind, EntityRef, PointSlot, Waypoint};
use crate::geometry::{HitBox, Point2};

/// 场景仓库：持有全部标记、负责 ID 分配、查找与带清理的删除。
///
/// 两个集合按插入顺序保存；以已有 ID 插入时原位替换（后写覆盖）。
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Scene {
    waypoints: Vec<Waypoint>,
    doors: Vec<Door>,
    next_entity_id: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub lobby: EntityId,
    pub corridor: EntityId,
    pub stairs: EntityId,
    pub exit: EntityId,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity_id);
        // u64::MAX 为保留值，计数器在此饱和
        self.next_entity_id = self.next_entity_id.saturating_add(1);
        id
    }

    /// 下一个将被分配的 ID。
    #[inline]
    pub fn id_counter(&self) -> u64 {
        self.next_entity_id
    }

    #[inline]
    pub fn set_id_counter(&mut self, value: u64) {
        self.next_entity_id = value;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty() && self.doors.is_empty()
    }

    pub fn create_waypoint(&mut self, name: impl Into<String>, point: Point2) -> EntityId {
        let id = self.next_id();
        self.waypoints.push(Waypoint::new(id, name, point));
        id
    }

    pub fn create_door(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        entrance_point: Point2,
        detail_level: DetailLevel,
    ) -> EntityId {
        let id = self.next_id();
        self.doors
            .push(Door::new(id, name, description, entrance_point, detail_level));
        id
    }

    /// 按 ID 插入一个已构造的路点，不触碰 ID 计数器。
    pub fn insert_waypoint(&mut self, waypoint: Waypoint) {
        match self.waypoints.iter_mut().find(|w| w.id == waypoint.id) {
            Some(slot) => *slot = waypoint,
            None => self.waypoints.push(waypoint),
        }
    }

    /// 按 ID 插入一个已构造的门，不触碰 ID 计数器。
    pub fn insert_door(&mut self, door: Door) {
        match self.doors.iter_mut().find(|d| d.id == door.id) {
            Some(slot) => *slot = door,
            None => self.doors.push(door),
        }
    }

    /// 删除实体。删除路点时同时从其余路点的邻接表中移除；
    /// 删除门时不清理路点上的 `doors` 引用。返回被删除实体的类型。
    pub fn delete(&mut self, id: EntityId) -> Option<EntityKind> {
        if let Some(index) = self.waypoints.iter().position(|w| w.id == id) {
            self.waypoints.remove(index);
            for waypoint in &mut self.waypoints {
                waypoint.connections.retain(|other| *other != id);
            }
            return Some(EntityKind::Waypoint);
        }
        if let Some(index) = self.doors.iter().position(|d| d.id == id) {
            self.doors.remove(index);
            return Some(EntityKind::Door);
        }
        None
    }

    #[inline]
    pub fn waypoint(&self, id: EntityId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    #[inline]
    pub fn waypoint_mut(&mut self, id: EntityId) -> Option<&mut Waypoint> {
        self.waypoints.iter_mut().find(|w| w.id == id)
    }

    #[inline]
    pub fn door(&self, id: EntityId) -> Option<&Door> {
        self.doors.iter().find(|d| d.id == id)
    }

    #[inline]
    pub fn door_mut(&mut self, id: EntityId) -> Option<&mut Door> {
        self.doors.iter_mut().find(|d| d.id == id)
    }

    /// 路点优先于门。
    pub fn entity(&self, id: EntityId) -> Option<EntityRef<'_>> {
        self.waypoint(id)
            .map(EntityRef::Waypoint)
            .or_else(|| self.door(id).map(EntityRef::Door))
    }

    #[inline]
    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    #[inline]
    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter()
    }

    /// 先路点后门，均按插入顺序。
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.waypoints
            .iter()
            .map(EntityRef::Waypoint)
            .chain(self.doors.iter().map(EntityRef::Door))
    }

    /// 解析命中测试返回的点槽位，供拖拽直接修改。
    pub fn point_mut(&mut self, id: EntityId, slot: PointSlot) -> Option<&mut Point2> {
        match slot {
            PointSlot::Waypoint => self.waypoint_mut(id).map(|w| &mut w.point),
            PointSlot::Entrance => self.door_mut(id).map(|d| &mut d.entrance_point),
            PointSlot::Inside => self.door_mut(id).and_then(|d| d.inside_point.as_mut()),
        }
    }

    pub fn are_connected(&self, a: EntityId, b: EntityId) -> bool {
        self.waypoint(a)
            .is_some_and(|waypoint| waypoint.connections.contains(&b))
    }

    /// 建立无向边，双方邻接表同时写入。两端必须是不同且存在的路点。
    pub fn connect_waypoints(&mut self, a: EntityId, b: EntityId) -> bool {
        if a == b || self.waypoint(a).is_none() || self.waypoint(b).is_none() {
            return false;
        }
        let mut changed = false;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(waypoint) = self.waypoint_mut(from) {
                if !waypoint.connections.contains(&to) {
                    waypoint.connections.push(to);
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn disconnect_waypoints(&mut self, a: EntityId, b: EntityId) -> bool {
        let mut changed = false;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(waypoint) = self.waypoint_mut(from) {
                let before = waypoint.connections.len();
                waypoint.connections.retain(|id| *id != to);
                changed |= waypoint.connections.len() != before;
            }
        }
        changed
    }

    /// 已连接则断开，否则连接。返回操作后是否处于连接状态。
    pub fn toggle_connection(&mut self, a: EntityId, b: EntityId) -> bool {
        if self.are_connected(a, b) {
            self.disconnect_waypoints(a, b);
            false
        } else {
            self.connect_waypoints(a, b)
        }
    }

    /// 把门追加到路点的 `doors` 列表；已存在时不重复添加。
    pub fn associate_door(&mut self, waypoint: EntityId, door: EntityId) -> bool {
        if self.door(door).is_none() {
            return false;
        }
        match self.waypoint_mut(waypoint) {
            Some(waypoint) if !waypoint.doors.contains(&door) => {
                waypoint.doors.push(door);
                true
            }
            _ => false,
        }
    }

    /// 返回所有不对称的邻接对 `(a, b)`：b 在 a 的列表中，反之不成立或 b 不存在。
    pub fn check_symmetry(&self) -> Vec<(EntityId, EntityId)> {
        let mut broken = Vec::new();
        for waypoint in &self.waypoints {
            for other in &waypoint.connections {
                if !self.are_connected(*other, waypoint.id) {
                    broken.push((waypoint.id, *other));
                }
            }
        }
        broken
    }

    /// 将同一命中框尺寸应用到全部标记（导入或示例场景加载后使用配置值）。
    pub fn apply_hit_box(&mut self, hit_box: HitBox) {
        for waypoint in &mut self.waypoints {
            waypoint.hit_box = hit_box;
        }
        for door in &mut self.doors {
            door.hit_box = hit_box;
        }
    }

    /// 为 CLI / 快速验证填充一组示例标记，返回关键实体 ID。
    pub fn populate_demo(&mut self) -> DemoEntities {
        let lobby = self.create_waypoint("Lobby", Point2::new(120.0, 400.0));
        let corridor = self.create_waypoint("Corridor", Point2::new(320.0, 400.0));
        let stairs = self.create_waypoint("Stairs", Point2::new(320.0, 180.0));
        let exit = self.create_door("Exit", "Main Exit", Point2::new(40.0, 400.0), DetailLevel::High);

        self.connect_waypoints(lobby, corridor);
        self.connect_waypoints(corridor, stairs);
        self.associate_door(lobby, exit);
        if let Some(waypoint) = self.waypoint_mut(corridor) {
            waypoint.set_navigation(true, Some(DetailLevel::Medium));
        }
        if let Some(door) = self.door_mut(exit) {
            door.add_inside_point();
        }

        DemoEntities {
            lobby,
            corridor,
            stairs,
            exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_shared_between_kinds() {
        let mut scene = Scene::new();
        let waypoint = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let door = scene.create_door("D", "", Point2::new(5.0, 5.0), DetailLevel::High);
        assert_ne!(waypoint, door);
        assert_eq!(door.get(), waypoint.get() + 1);
        assert_eq!(scene.id_counter(), door.get() + 1);
        assert_eq!(scene.entity(door).map(EntityRef::kind), Some(EntityKind::Door));
    }

    #[test]
    fn toggle_connection_is_symmetric() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let b = scene.create_waypoint("B", Point2::new(50.0, 0.0));

        assert!(scene.toggle_connection(a, b));
        assert_eq!(scene.waypoint(a).unwrap().connections, vec![b]);
        assert_eq!(scene.waypoint(b).unwrap().connections, vec![a]);

        assert!(!scene.toggle_connection(b, a));
        assert!(scene.waypoint(a).unwrap().connections.is_empty());
        assert!(scene.waypoint(b).unwrap().connections.is_empty());
        assert!(scene.check_symmetry().is_empty());
    }

    #[test]
    fn connect_rejects_self_and_unknown_waypoints() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let door = scene.create_door("D", "", Point2::new(5.0, 5.0), DetailLevel::Low);
        assert!(!scene.connect_waypoints(a, a));
        assert!(!scene.connect_waypoints(a, door));
        assert!(!scene.connect_waypoints(a, EntityId::new(99)));
        assert!(scene.waypoint(a).unwrap().connections.is_empty());
    }

    #[test]
    fn deleting_waypoint_repairs_adjacency() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let b = scene.create_waypoint("B", Point2::new(50.0, 0.0));
        let c = scene.create_waypoint("C", Point2::new(100.0, 0.0));
        scene.connect_waypoints(a, b);
        scene.connect_waypoints(b, c);
        scene.connect_waypoints(a, c);

        assert_eq!(scene.delete(b), Some(EntityKind::Waypoint));
        assert!(scene.waypoint(b).is_none());
        for waypoint in scene.waypoints() {
            assert!(!waypoint.connections.contains(&b));
            for other in &waypoint.connections {
                assert!(scene.waypoint(*other).is_some());
            }
        }
        assert!(scene.are_connected(a, c));
        assert!(scene.check_symmetry().is_empty());
    }

    #[test]
    fn deleting_door_leaves_waypoint_references() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let door = scene.create_door("D", "", Point2::new(5.0, 5.0), DetailLevel::High);
        assert!(scene.associate_door(a, door));
        assert!(!scene.associate_door(a, door));

        assert_eq!(scene.delete(door), Some(EntityKind::Door));
        assert!(scene.door(door).is_none());
        assert_eq!(scene.waypoint(a).unwrap().doors, vec![door]);
        assert_eq!(scene.delete(door), None);
    }

    #[test]
    fn insert_with_existing_id_replaces_in_place() {
        let mut scene = Scene::new();
        scene.insert_waypoint(Waypoint::new(EntityId::new(4), "first", Point2::new(0.0, 0.0)));
        scene.insert_waypoint(Waypoint::new(EntityId::new(2), "other", Point2::new(0.0, 0.0)));
        scene.insert_waypoint(Waypoint::new(EntityId::new(4), "second", Point2::new(1.0, 1.0)));

        let names: Vec<_> = scene.waypoints().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["second", "other"]);
        assert_eq!(scene.id_counter(), 0);
    }

    #[test]
    fn point_mut_resolves_slots() {
        let mut scene = Scene::new();
        let ids = scene.populate_demo();
        let inside = scene
            .point_mut(ids.exit, PointSlot::Inside)
            .expect("demo exit has an inside point");
        inside.0.x += 5.0;
        assert_eq!(
            scene.door(ids.exit).unwrap().inside_point,
            Some(Point2::new(55.0, 400.0))
        );
        assert!(scene.point_mut(ids.lobby, PointSlot::Entrance).is_none());
        assert!(scene.check_symmetry().is_empty());
        assert_eq!(scene.entities().count(), 4);
    }

    #[test]
    fn apply_hit_box_updates_every_entity() {
        let mut scene = Scene::new();
        scene.populate_demo();
        scene.apply_hit_box(HitBox::square(20.0));

        assert!(scene.waypoints().all(|w| w.hit_box == HitBox::square(20.0)));
        assert!(scene.doors().all(|d| d.hit_box == HitBox::square(20.0)));
        // 放大后原本落在框外的点也能命中
        let lobby = scene.waypoints().next().unwrap().id;
        assert_eq!(
            scene.waypoint(lobby).unwrap().check_bounds(Point2::new(128.0, 400.0)),
            Some(PointSlot::Waypoint)
        );
    }

    #[test]
    fn id_counter_saturates_instead_of_overflowing() {
        let mut scene = Scene::new();
        scene.set_id_counter(u64::MAX - 1);
        let last = scene.create_waypoint("last", Point2::new(0.0, 0.0));
        assert_eq!(last.get(), u64::MAX - 1);
        assert_eq!(scene.id_counter(), u64::MAX);

        scene.create_door("D", "", Point2::new(5.0, 5.0), DetailLevel::High);
        assert_eq!(scene.id_counter(), u64::MAX);
    }
}
