pub mod command;
pub mod render;
pub mod tool;

pub mod errors {
    use thiserror::Error;
    use waymark_core::entity::EntityKind;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("background image size is not known yet")]
        ImageSizeUnknown,
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("entity {id} is not a {expected:?}")]
        WrongKind { id: u64, expected: EntityKind },
        #[error("invalid argument: {0}")]
        InvalidArgument(String),
    }
}

pub mod editor {
    use tracing::{debug, info};
    use waymark_core::entity::{EntityId, EntityRef};
    use waymark_core::geometry::{Point2, Vector2};
    use waymark_core::scene::Scene;
    use waymark_core::transform::{ImageSize, MapTransform, TransformSettings};

    use crate::errors::EngineError;
    use crate::render::{DrawCommand, build_draw_list};
    use crate::tool::{AddMode, EditorEvent, PointerEvent, Tool, ToolDefaults, ToolState};

    /// 编辑上下文：场景、工具状态与坐标换算常量集中于此，显式传给各组件。
    #[derive(Debug)]
    pub struct Editor {
        scene: Scene,
        tools: ToolState,
        transform: TransformSettings,
        image_size: Option<ImageSize>,
    }

    impl Editor {
        pub fn new(transform: TransformSettings, defaults: ToolDefaults) -> Self {
            Self {
                scene: Scene::new(),
                tools: ToolState::new(defaults),
                transform,
                image_size: None,
            }
        }

        /// 替换当前场景，清除选中与进行中的手势，保留平移与工具设置。
        pub fn load_scene(&mut self, scene: Scene) {
            self.scene = scene;
            self.tools.clear_selection();
            self.tools.reset_gesture();
            debug!(
                waypoints = self.scene.waypoints().count(),
                doors = self.scene.doors().count(),
                "已载入场景"
            );
        }

        #[inline]
        pub fn scene(&self) -> &Scene {
            &self.scene
        }

        #[inline]
        pub fn scene_mut(&mut self) -> &mut Scene {
            &mut self.scene
        }

        #[inline]
        pub fn tools(&self) -> &ToolState {
            &self.tools
        }

        #[inline]
        pub fn tools_mut(&mut self) -> &mut ToolState {
            &mut self.tools
        }

        #[inline]
        pub fn set_tool(&mut self, tool: Tool) {
            self.tools.set_tool(tool);
        }

        #[inline]
        pub fn set_add_mode(&mut self, mode: AddMode) {
            self.tools.set_add_mode(mode);
        }

        /// 背景图加载完成后由宿主调用。
        pub fn set_image_size(&mut self, size: ImageSize) {
            info!(width = size.width, height = size.height, "背景图尺寸已确定");
            self.image_size = Some(size);
        }

        #[inline]
        pub fn image_size(&self) -> Option<ImageSize> {
            self.image_size
        }

        /// 图片尺寸未知前坐标换算无意义，返回错误而不是给出错误结果。
        pub fn transform(&self) -> Result<MapTransform, EngineError> {
            self.image_size
                .map(|size| self.transform.with_image(size))
                .ok_or(EngineError::ImageSizeUnknown)
        }

        /// 把画布坐标换算为地图局部坐标（扣除平移偏移）。
        pub fn to_map_local(&self, canvas: Point2) -> Point2 {
            let pan = self.tools.pan_offset();
            canvas.translate(Vector2::new(-pan.x(), -pan.y()))
        }

        pub fn handle_pointer(&mut self, event: PointerEvent) -> Vec<EditorEvent> {
            self.tools.handle(event, &mut self.scene)
        }

        pub fn selected_id(&self) -> Option<EntityId> {
            self.tools.selection().map(|selection| selection.id)
        }

        pub fn selected_entity(&self) -> Option<EntityRef<'_>> {
            self.selected_id().and_then(|id| self.scene.entity(id))
        }

        pub fn draw_list(&self) -> Vec<DrawCommand> {
            build_draw_list(&self.scene, self.selected_id(), self.tools.pan_offset())
        }
    }

    impl Default for Editor {
        fn default() -> Self {
            Self::new(TransformSettings::default(), ToolDefaults::default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn transform_requires_image_size() {
            let mut editor = Editor::default();
            assert!(matches!(
                editor.transform(),
                Err(EngineError::ImageSizeUnknown)
            ));
            editor.set_image_size(ImageSize::new(640, 1000));
            let transform = editor.transform().expect("image size set");
            assert!((transform.image_height() - 1000.0).abs() < f64::EPSILON);
        }

        #[test]
        fn canvas_points_are_shifted_by_pan_offset() {
            let mut editor = Editor::default();
            editor.handle_pointer(PointerEvent::Down {
                position: Point2::new(0.0, 0.0),
            });
            editor.handle_pointer(PointerEvent::Move {
                position: Point2::new(30.0, 20.0),
                delta: Vector2::new(30.0, 20.0),
            });
            editor.handle_pointer(PointerEvent::Up {
                position: Point2::new(30.0, 20.0),
            });

            editor.set_tool(Tool::Add);
            let local = editor.to_map_local(Point2::new(100.0, 100.0));
            assert_eq!(local, Point2::new(70.0, 80.0));
            editor.handle_pointer(PointerEvent::Down { position: local });
            editor.handle_pointer(PointerEvent::Up { position: local });

            let selected = editor.selected_entity().expect("new waypoint selected");
            assert_eq!(selected.name(), "Waypoint0");
            match editor.draw_list().last() {
                Some(DrawCommand::FillRect { center, .. }) => {
                    assert_eq!(*center, Point2::new(100.0, 100.0));
                }
                other => panic!("unexpected draw command: {other:?}"),
            }
        }

        #[test]
        fn load_scene_resets_gesture_state() {
            let mut editor = Editor::default();
            let mut scene = Scene::new();
            let ids = scene.populate_demo();
            editor.load_scene(scene.clone());
            editor.set_tool(Tool::Connect);
            editor.handle_pointer(PointerEvent::Up {
                position: Point2::new(120.0, 400.0),
            });
            assert_eq!(editor.tools().pending_anchor(), Some(ids.lobby));

            editor.load_scene(scene);
            assert_eq!(editor.tools().pending_anchor(), None);
            assert!(editor.selected_entity().is_none());
        }
    }
}
