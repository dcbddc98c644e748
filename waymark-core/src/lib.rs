pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。屏幕坐标与世界坐标共用此类型，
    /// 由调用方根据上下文区分。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        /// 原地平移，拖拽时直接作用在实体持有的点上。
        #[inline]
        pub fn translate_mut(&mut self, offset: Vector2) {
            self.0 += offset.0;
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于指针位移与平移偏移量。
    #[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl std::ops::AddAssign for Vector2 {
        fn add_assign(&mut self, rhs: Self) {
            self.0 += rhs.0;
        }
    }

    /// 以实体点为中心的轴对齐命中框。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct HitBox {
        pub width: f64,
        pub height: f64,
    }

    impl HitBox {
        pub const DEFAULT_SIZE: f64 = 10.0;

        #[inline]
        pub fn new(width: f64, height: f64) -> Self {
            Self { width, height }
        }

        #[inline]
        pub fn square(size: f64) -> Self {
            Self::new(size, size)
        }

        /// 闭区间判定：恰好落在边上的查询点也算命中。
        pub fn contains(&self, center: Point2, query: Point2) -> bool {
            let half_w = self.width / 2.0;
            let half_h = self.height / 2.0;
            center.x() - half_w <= query.x()
                && query.x() <= center.x() + half_w
                && center.y() - half_h <= query.y()
                && query.y() <= center.y() + half_h
        }
    }

    impl Default for HitBox {
        fn default() -> Self {
            Self::square(Self::DEFAULT_SIZE)
        }
    }

}

pub mod entity;
pub mod scene;
pub mod transform;
