use failchain::{BoxedError, ChainErrorKind};
use failure::Fail;
use std::fmt::Debug;
use std::result::Result as StdResult;

pub type Error = BoxedError<ErrorKind>;
pub type Result<T> = StdResult<T, Error>;

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "Polygon triangulation failed: {}", 0)]
    Triangulation(String),

    #[fail(display = "Convex hull computation failed: {}", 0)]
    Hull(String),
}

impl ChainErrorKind for ErrorKind {
    type Error = Error;
}

impl ErrorKind {
    pub(crate) fn ear_clipping<ErrorT: Debug>(num_points: usize, error: ErrorT) -> Self {
        ErrorKind::Triangulation(format!(
            "ear clipping {} points: {:?}",
            num_points, error
        ))
    }

    pub(crate) fn too_few_hull_points(num_points: usize) -> Self {
        ErrorKind::Hull(format!(
            "need at least 4 distinct points, got {}",
            num_points
        ))
    }

    pub(crate) fn degenerate_hull(what: &'static str) -> Self {
        ErrorKind::Hull(format!("input points are {}", what))
    }
}
