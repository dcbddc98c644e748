//! 决定"画什么"：把场景转换为一串绘制原语，由外部渲染器负责像素输出。

use waymark_core::entity::{DetailLevel, Door, EntityId, Waypoint};
use waymark_core::geometry::{Point2, Vector2};
use waymark_core::scene::Scene;

const INSIDE_POINT_RADIUS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const SELECTED: Rgba = Rgba::opaque(0, 128, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn for_detail_level(level: DetailLevel) -> Self {
        match level {
            DetailLevel::Low => Rgba::opaque(255, 255, 0),
            DetailLevel::Medium => Rgba::opaque(255, 87, 51),
            DetailLevel::High => Rgba::opaque(255, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// 背景图，左上角位于平移偏移处。
    Image { top_left: Point2 },
    FillRect {
        center: Point2,
        width: f64,
        height: f64,
        color: Rgba,
    },
    Line { from: Point2, to: Point2, color: Rgba },
    Circle { center: Point2, radius: f64, color: Rgba },
}

/// 生成整帧绘制指令：背景图、路点（连线、门关联线、方块），最后是门。
pub fn build_draw_list(scene: &Scene, selected: Option<EntityId>, pan: Vector2) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Image {
        top_left: Point2::new(pan.x(), pan.y()),
    }];
    for waypoint in scene.waypoints() {
        push_waypoint(&mut commands, scene, waypoint, selected == Some(waypoint.id), pan);
    }
    for door in scene.doors() {
        push_door(&mut commands, door, selected == Some(door.id), pan);
    }
    commands
}

fn push_waypoint(
    commands: &mut Vec<DrawCommand>,
    scene: &Scene,
    waypoint: &Waypoint,
    selected: bool,
    pan: Vector2,
) {
    let origin = waypoint.point.translate(pan);
    // 每条无向边只画一次。
    for other in waypoint.connections.iter().filter(|id| **id > waypoint.id) {
        if let Some(other) = scene.waypoint(*other) {
            commands.push(DrawCommand::Line {
                from: origin,
                to: other.point.translate(pan),
                color: Rgba::BLACK,
            });
        }
    }
    // 已删除的门仍可能留在 `doors` 中，无法解析时跳过。
    for door in waypoint.doors.iter().filter_map(|id| scene.door(*id)) {
        commands.push(DrawCommand::Line {
            from: origin,
            to: door.entrance_point.translate(pan),
            color: Rgba::BLACK,
        });
    }
    commands.push(DrawCommand::FillRect {
        center: origin,
        width: waypoint.hit_box.width,
        height: waypoint.hit_box.height,
        color: if selected { Rgba::SELECTED } else { Rgba::BLACK },
    });
}

fn push_door(commands: &mut Vec<DrawCommand>, door: &Door, selected: bool, pan: Vector2) {
    let color = if selected {
        Rgba::SELECTED
    } else {
        Rgba::for_detail_level(door.detail_level)
    };
    let entrance = door.entrance_point.translate(pan);
    if let Some(inside) = door.inside_point {
        let inside = inside.translate(pan);
        commands.push(DrawCommand::Line {
            from: entrance,
            to: inside,
            color: Rgba::BLACK,
        });
        commands.push(DrawCommand::Circle {
            center: inside,
            radius: INSIDE_POINT_RADIUS,
            color,
        });
    }
    commands.push(DrawCommand::FillRect {
        center: entrance,
        width: door.hit_box.width,
        height: door.hit_box.height,
        color,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scene_draw_list_shape() {
        let mut scene = Scene::new();
        let ids = scene.populate_demo();
        let commands = build_draw_list(&scene, Some(ids.exit), Vector2::new(10.0, 0.0));

        assert_eq!(
            commands[0],
            DrawCommand::Image {
                top_left: Point2::new(10.0, 0.0)
            }
        );
        let lines = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        // 两条路点边 + 一条门关联线 + 一条门内侧连线。
        assert_eq!(lines, 4);
        assert!(commands.iter().any(|c| matches!(
            c,
            DrawCommand::Circle { radius, color, .. }
                if (*radius - 5.0).abs() < f64::EPSILON && *color == Rgba::SELECTED
        )));
        assert_eq!(
            commands.last(),
            Some(&DrawCommand::FillRect {
                center: Point2::new(50.0, 400.0),
                width: 10.0,
                height: 10.0,
                color: Rgba::SELECTED,
            })
        );
    }

    #[test]
    fn door_colour_follows_detail_level() {
        let mut scene = Scene::new();
        scene.create_door("D", "", Point2::new(0.0, 0.0), DetailLevel::Medium);
        let commands = build_draw_list(&scene, None, Vector2::ZERO);
        assert_eq!(
            commands[1],
            DrawCommand::FillRect {
                center: Point2::new(0.0, 0.0),
                width: 10.0,
                height: 10.0,
                color: Rgba::opaque(255, 87, 51),
            }
        );
    }

    #[test]
    fn dangling_door_reference_is_skipped() {
        let mut scene = Scene::new();
        let waypoint = scene.create_waypoint("W", Point2::new(0.0, 0.0));
        let door = scene.create_door("D", "", Point2::new(20.0, 0.0), DetailLevel::Low);
        scene.associate_door(waypoint, door);
        scene.delete(door);

        let commands = build_draw_list(&scene, None, Vector2::ZERO);
        assert_eq!(commands.len(), 2);
    }
}
