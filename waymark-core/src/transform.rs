use serde::{Deserialize, Serialize};

use crate::geometry::Point2;

pub const DEFAULT_RESOLUTION: f64 = 0.05;
pub const DEFAULT_ORIGIN: (f64, f64) = (-100.0, -100.0);

/// 背景图的像素尺寸，只有在图片加载完成后才可获得。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 世界坐标 ⇄ 地图像素坐标的换算常量（不含图片高度）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    /// 每像素对应的世界单位。
    pub resolution: f64,
    pub origin: Point2,
}

impl TransformSettings {
    #[inline]
    pub fn new(resolution: f64, origin: Point2) -> Self {
        Self { resolution, origin }
    }

    /// 绑定图片尺寸后得到可用的换算器。
    #[inline]
    pub fn with_image(self, size: ImageSize) -> MapTransform {
        MapTransform {
            resolution: self.resolution,
            origin: self.origin,
            image_height: f64::from(size.height),
        }
    }
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            origin: Point2::new(DEFAULT_ORIGIN.0, DEFAULT_ORIGIN.1),
        }
    }
}

/// 纯函数式坐标换算。世界坐标 y 轴向上，屏幕像素 y 轴向下，因此需要图片高度翻转。
///
/// 只有导出与导入时使用的 `image_height` 相同，往返换算才是精确的。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapTransform {
    resolution: f64,
    origin: Point2,
    image_height: f64,
}

impl MapTransform {
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    #[inline]
    pub fn origin(&self) -> Point2 {
        self.origin
    }

    #[inline]
    pub fn image_height(&self) -> f64 {
        self.image_height
    }

    pub fn to_world(&self, screen: Point2) -> Point2 {
        Point2::new(
            screen.x() * self.resolution + self.origin.x(),
            (self.image_height - screen.y()) * self.resolution + self.origin.y(),
        )
    }

    pub fn to_screen(&self, world: Point2) -> Point2 {
        Point2::new(
            (world.x() - self.origin.x()) / self.resolution,
            self.image_height - (world.y() - self.origin.y()) / self.resolution,
        )
    }
}
