pub mod errors;
pub mod hull;
pub mod triangulate;
pub mod uv_wrap;

pub use self::errors::{Error, ErrorKind, Result};
pub use self::hull::ConvexHull;
pub use cgmath::{vec2, vec3, vec4, Point2, Point3, Vector2, Vector3, Vector4};

pub type Vec2<T> = Vector2<T>;
pub type Vec3<T> = Vector3<T>;
pub type Vec4<T> = Vector4<T>;

pub type Pnt2<T> = Point2<T>;
pub type Pnt3<T> = Point3<T>;

pub type Vec2f = Vec2<f32>;
pub type Vec3f = Vec3<f32>;
pub type Vec4f = Vec4<f32>;

pub type Pnt2f = Pnt2<f32>;
pub type Pnt3f = Pnt3<f32>;

pub mod prelude {
    pub use cgmath::prelude::*;
}
