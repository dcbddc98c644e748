use tracing::{debug, trace};
use waymark_core::entity::{DetailLevel, EntityId, EntityKind, PointSlot};
use waymark_core::geometry::{HitBox, Point2, Vector2};
use waymark_core::scene::Scene;

/// 由宿主设置的当前工具。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pan,
    Add,
    Select,
    Remove,
    Connect,
}

/// 添加工具的子模式。`Feature` 为保留占位，当前不产生任何实体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddMode {
    #[default]
    Waypoint,
    Door,
    Feature,
}

/// 指针事件，坐标已换算为地图局部坐标（扣除平移偏移）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Point2 },
    Move { position: Point2, delta: Vector2 },
    Up { position: Point2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
}

/// 交给宿主的通知：打开编辑面板 / 请求重绘。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    EntitySelected(Option<SelectedEntity>),
    SceneChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub id: EntityId,
    /// 被选中的具体点，拖拽时据此移动。
    pub slot: PointSlot,
}

/// 新建实体时使用的默认值。
#[derive(Debug, Clone)]
pub struct ToolDefaults {
    pub door_detail_level: DetailLevel,
    pub waypoint_prefix: String,
    pub door_prefix: String,
    pub hit_box: HitBox,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            door_detail_level: DetailLevel::High,
            waypoint_prefix: "Waypoint".to_string(),
            door_prefix: "Door".to_string(),
            hit_box: HitBox::default(),
        }
    }
}

/// 工具状态机：解释指针手势并修改场景。
///
/// 切换工具不会清除待定锚点或拖拽状态，需要时由宿主调用 [`ToolState::reset_gesture`]。
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    tool: Tool,
    add_mode: AddMode,
    pressed: bool,
    pan_offset: Vector2,
    selection: Option<Selection>,
    pending_anchor: Option<EntityId>,
    defaults: ToolDefaults,
}

impl ToolState {
    pub fn new(defaults: ToolDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    #[inline]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[inline]
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    #[inline]
    pub fn add_mode(&self) -> AddMode {
        self.add_mode
    }

    #[inline]
    pub fn set_add_mode(&mut self, mode: AddMode) {
        self.add_mode = mode;
    }

    #[inline]
    pub fn pan_offset(&self) -> Vector2 {
        self.pan_offset
    }

    #[inline]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[inline]
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    #[inline]
    pub fn pending_anchor(&self) -> Option<EntityId> {
        self.pending_anchor
    }

    #[inline]
    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    /// 显式取消进行中的手势（待定锚点与按下状态）。
    pub fn reset_gesture(&mut self) {
        self.pending_anchor = None;
        self.pressed = false;
    }

    pub fn handle(&mut self, event: PointerEvent, scene: &mut Scene) -> Vec<EditorEvent> {
        trace!(?event, tool = ?self.tool, "处理指针事件");
        match event {
            PointerEvent::Down { position } => self.on_pointer_down(position, scene),
            PointerEvent::Move { delta, .. } => self.on_pointer_move(delta, scene),
            PointerEvent::Up { position } => self.on_pointer_up(position, scene),
        }
    }

    fn on_pointer_down(&mut self, position: Point2, scene: &Scene) -> Vec<EditorEvent> {
        self.pressed = true;
        if self.tool != Tool::Select {
            return Vec::new();
        }
        match scene.hit_test(position) {
            Some(hit) => {
                self.selection = Some(Selection {
                    id: hit.id,
                    slot: hit.slot,
                });
                debug!(id = hit.id.get(), kind = ?hit.kind, "选中实体");
                vec![EditorEvent::EntitySelected(Some(SelectedEntity {
                    id: hit.id,
                    kind: hit.kind,
                }))]
            }
            None => {
                self.selection = None;
                vec![EditorEvent::EntitySelected(None)]
            }
        }
    }

    fn on_pointer_move(&mut self, delta: Vector2, scene: &mut Scene) -> Vec<EditorEvent> {
        if !self.pressed {
            return Vec::new();
        }
        match self.tool {
            Tool::Pan => {
                self.pan_offset += delta;
                vec![EditorEvent::SceneChanged]
            }
            Tool::Select => {
                let Some(Selection { id, slot }) = self.selection else {
                    return Vec::new();
                };
                match scene.point_mut(id, slot) {
                    Some(point) => {
                        point.translate_mut(delta);
                        vec![EditorEvent::SceneChanged]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn on_pointer_up(&mut self, position: Point2, scene: &mut Scene) -> Vec<EditorEvent> {
        self.pressed = false;
        match self.tool {
            Tool::Pan | Tool::Select => Vec::new(),
            Tool::Add => self.add_entity(position, scene),
            Tool::Remove => self.remove_entity(position, scene),
            Tool::Connect => self.connect(position, scene),
        }
    }

    fn add_entity(&mut self, position: Point2, scene: &mut Scene) -> Vec<EditorEvent> {
        let (id, kind, slot) = match self.add_mode {
            AddMode::Waypoint => {
                let name = format!("{}{}", self.defaults.waypoint_prefix, scene.id_counter());
                let id = scene.create_waypoint(name, position);
                if let Some(waypoint) = scene.waypoint_mut(id) {
                    waypoint.hit_box = self.defaults.hit_box;
                }
                (id, EntityKind::Waypoint, PointSlot::Waypoint)
            }
            AddMode::Door => {
                let name = format!("{}{}", self.defaults.door_prefix, scene.id_counter());
                let id = scene.create_door(name, "", position, self.defaults.door_detail_level);
                if let Some(door) = scene.door_mut(id) {
                    door.hit_box = self.defaults.hit_box;
                }
                (id, EntityKind::Door, PointSlot::Entrance)
            }
            AddMode::Feature => {
                debug!("Feature 子模式尚未实现，忽略添加手势");
                return Vec::new();
            }
        };
        debug!(id = id.get(), ?kind, x = position.x(), y = position.y(), "新建实体");
        self.selection = Some(Selection { id, slot });
        vec![
            EditorEvent::EntitySelected(Some(SelectedEntity { id, kind })),
            EditorEvent::SceneChanged,
        ]
    }

    fn remove_entity(&mut self, position: Point2, scene: &mut Scene) -> Vec<EditorEvent> {
        let Some(hit) = scene.hit_test(position) else {
            return Vec::new();
        };
        scene.delete(hit.id);
        debug!(id = hit.id.get(), kind = ?hit.kind, "删除实体");
        self.selection = None;
        vec![EditorEvent::SceneChanged]
    }

    fn connect(&mut self, position: Point2, scene: &mut Scene) -> Vec<EditorEvent> {
        let anchor = match self.pending_anchor {
            Some(anchor) if scene.entity(anchor).is_some() => anchor,
            _ => {
                // 第一阶段：记录锚点，不修改图。
                self.pending_anchor = scene.hit_test(position).map(|hit| hit.id);
                if let Some(anchor) = self.pending_anchor {
                    debug!(anchor = anchor.get(), "连接锚点已设置");
                }
                return Vec::new();
            }
        };

        let Some(target) = scene.hit_test_excluding(position, anchor) else {
            if scene.hit_test(position).is_some_and(|hit| hit.id == anchor) {
                debug!(anchor = anchor.get(), "再次点击锚点，取消连接");
                self.pending_anchor = None;
            }
            return Vec::new();
        };

        let anchor_kind = scene.entity(anchor).map(|entity| entity.kind());
        match (anchor_kind, target.kind) {
            (Some(EntityKind::Waypoint), EntityKind::Waypoint) => {
                let connected = scene.toggle_connection(anchor, target.id);
                debug!(a = anchor.get(), b = target.id.get(), connected, "切换路点连接");
            }
            (Some(EntityKind::Waypoint), EntityKind::Door) => {
                scene.associate_door(anchor, target.id);
            }
            (Some(EntityKind::Door), EntityKind::Waypoint) => {
                scene.associate_door(target.id, anchor);
            }
            _ => {
                debug!(a = anchor.get(), b = target.id.get(), "两个门之间无可建立的关联");
            }
        }
        self.pending_anchor = None;
        vec![EditorEvent::SceneChanged]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point2::new(x, y),
        }
    }

    fn drag(dx: f64, dy: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point2::new(0.0, 0.0),
            delta: Vector2::new(dx, dy),
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            position: Point2::new(x, y),
        }
    }

    fn click(state: &mut ToolState, scene: &mut Scene, x: f64, y: f64) -> Vec<EditorEvent> {
        let mut events = state.handle(down(x, y), scene);
        events.extend(state.handle(up(x, y), scene));
        events
    }

    #[test]
    fn add_tool_creates_and_selects() {
        let mut scene = Scene::new();
        let mut state = ToolState::default();
        state.set_tool(Tool::Add);

        let events = click(&mut state, &mut scene, 40.0, 60.0);
        let waypoint = scene.waypoints().next().expect("waypoint created");
        assert_eq!(waypoint.point, Point2::new(40.0, 60.0));
        assert_eq!(waypoint.name, "Waypoint0");
        assert_eq!(
            events[0],
            EditorEvent::EntitySelected(Some(SelectedEntity {
                id: waypoint.id,
                kind: EntityKind::Waypoint,
            }))
        );
        assert_eq!(state.selection().map(|s| s.id), Some(waypoint.id));

        state.set_add_mode(AddMode::Door);
        click(&mut state, &mut scene, 100.0, 100.0);
        let door = scene.doors().next().expect("door created");
        assert_eq!(door.detail_level, DetailLevel::High);
        assert!(door.inside_point.is_none());
        assert_eq!(door.id.get(), 1);

        state.set_add_mode(AddMode::Feature);
        assert!(click(&mut state, &mut scene, 200.0, 200.0).is_empty());
        assert_eq!(scene.entities().count(), 2);
    }

    #[test]
    fn add_tool_applies_configured_defaults() {
        let mut scene = Scene::new();
        let mut state = ToolState::new(ToolDefaults {
            door_detail_level: DetailLevel::Low,
            door_prefix: "Gate".to_string(),
            hit_box: HitBox::square(20.0),
            ..ToolDefaults::default()
        });
        state.set_tool(Tool::Add);
        state.set_add_mode(AddMode::Door);
        click(&mut state, &mut scene, 0.0, 0.0);

        let door = scene.doors().next().expect("door created");
        assert_eq!(door.name, "Gate0");
        assert_eq!(door.detail_level, DetailLevel::Low);
        assert_eq!(scene.hit_test(Point2::new(9.0, 9.0)).map(|hit| hit.id), Some(door.id));
    }

    #[test]
    fn pan_accumulates_only_while_pressed() {
        let mut scene = Scene::new();
        let mut state = ToolState::default();
        assert!(state.handle(drag(5.0, 5.0), &mut scene).is_empty());

        state.handle(down(0.0, 0.0), &mut scene);
        assert_eq!(
            state.handle(drag(3.0, -2.0), &mut scene),
            vec![EditorEvent::SceneChanged]
        );
        state.handle(drag(1.0, 1.0), &mut scene);
        state.handle(up(0.0, 0.0), &mut scene);
        state.handle(drag(100.0, 100.0), &mut scene);
        assert_eq!(state.pan_offset(), Vector2::new(4.0, -1.0));
    }

    #[test]
    fn select_drags_the_hit_point() {
        let mut scene = Scene::new();
        let door = scene.create_door("D", "", Point2::new(50.0, 50.0), DetailLevel::Low);
        scene.door_mut(door).unwrap().add_inside_point();
        let mut state = ToolState::default();
        state.set_tool(Tool::Select);

        let events = state.handle(down(61.0, 50.0), &mut scene);
        assert_eq!(
            events,
            vec![EditorEvent::EntitySelected(Some(SelectedEntity {
                id: door,
                kind: EntityKind::Door,
            }))]
        );
        state.handle(drag(5.0, 10.0), &mut scene);
        state.handle(up(66.0, 60.0), &mut scene);
        state.handle(drag(5.0, 10.0), &mut scene);

        let door = scene.door(door).unwrap();
        assert_eq!(door.entrance_point, Point2::new(50.0, 50.0));
        assert_eq!(door.inside_point, Some(Point2::new(65.0, 60.0)));
    }

    #[test]
    fn select_on_empty_space_clears_selection() {
        let mut scene = Scene::new();
        scene.create_waypoint("W", Point2::new(0.0, 0.0));
        let mut state = ToolState::default();
        state.set_tool(Tool::Select);
        state.handle(down(0.0, 0.0), &mut scene);
        assert!(state.selection().is_some());
        state.handle(up(0.0, 0.0), &mut scene);

        let events = state.handle(down(300.0, 300.0), &mut scene);
        assert_eq!(events, vec![EditorEvent::EntitySelected(None)]);
        assert!(state.selection().is_none());
    }

    #[test]
    fn remove_tool_deletes_hit_entity() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let b = scene.create_waypoint("B", Point2::new(100.0, 0.0));
        scene.connect_waypoints(a, b);
        let mut state = ToolState::default();
        state.set_tool(Tool::Remove);

        assert!(click(&mut state, &mut scene, 500.0, 500.0).is_empty());
        assert_eq!(
            click(&mut state, &mut scene, 101.0, 1.0),
            vec![EditorEvent::SceneChanged]
        );
        assert!(scene.waypoint(b).is_none());
        assert!(scene.waypoint(a).unwrap().connections.is_empty());
    }

    #[test]
    fn connect_twice_toggles_edge() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let b = scene.create_waypoint("B", Point2::new(100.0, 0.0));
        let mut state = ToolState::default();
        state.set_tool(Tool::Connect);

        assert!(click(&mut state, &mut scene, 0.0, 0.0).is_empty());
        assert_eq!(state.pending_anchor(), Some(a));
        assert_eq!(
            click(&mut state, &mut scene, 100.0, 0.0),
            vec![EditorEvent::SceneChanged]
        );
        assert_eq!(state.pending_anchor(), None);
        assert!(scene.are_connected(a, b) && scene.are_connected(b, a));

        click(&mut state, &mut scene, 100.0, 0.0);
        click(&mut state, &mut scene, 0.0, 0.0);
        assert!(!scene.are_connected(a, b));
        assert!(!scene.are_connected(b, a));
    }

    #[test]
    fn connect_miss_keeps_anchor_and_anchor_click_cancels() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let mut state = ToolState::default();
        state.set_tool(Tool::Connect);

        click(&mut state, &mut scene, 0.0, 0.0);
        assert!(click(&mut state, &mut scene, 300.0, 300.0).is_empty());
        assert_eq!(state.pending_anchor(), Some(a));

        click(&mut state, &mut scene, 1.0, 1.0);
        assert_eq!(state.pending_anchor(), None);
        assert!(scene.waypoint(a).unwrap().connections.is_empty());
    }

    #[test]
    fn connect_associates_door_in_either_order() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let door = scene.create_door("D", "", Point2::new(100.0, 0.0), DetailLevel::High);
        let mut state = ToolState::default();
        state.set_tool(Tool::Connect);

        click(&mut state, &mut scene, 100.0, 0.0);
        click(&mut state, &mut scene, 0.0, 0.0);
        assert_eq!(scene.waypoint(a).unwrap().doors, vec![door]);

        // 再次关联不会移除，也不会重复添加。
        click(&mut state, &mut scene, 0.0, 0.0);
        click(&mut state, &mut scene, 100.0, 0.0);
        assert_eq!(scene.waypoint(a).unwrap().doors, vec![door]);
    }

    #[test]
    fn switching_tools_keeps_pending_anchor() {
        let mut scene = Scene::new();
        let a = scene.create_waypoint("A", Point2::new(0.0, 0.0));
        let mut state = ToolState::default();
        state.set_tool(Tool::Connect);
        click(&mut state, &mut scene, 0.0, 0.0);

        state.set_tool(Tool::Pan);
        state.set_tool(Tool::Connect);
        assert_eq!(state.pending_anchor(), Some(a));

        state.reset_gesture();
        assert_eq!(state.pending_anchor(), None);
    }
}
