use indexmap::IndexMap;
use pigtrack::{BoundingBox, ObjectId};
use serde::{Deserialize, Serialize};

/// Image space centre of a pig, serialised as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f32, pub f32);

impl Point {
    pub fn x(&self) -> f32 {
        self.0
    }

    pub fn y(&self) -> f32 {
        self.1
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        (self.0 - other.0).hypot(self.1 - other.1)
    }
}

impl From<&BoundingBox> for Point {
    fn from(bbox: &BoundingBox) -> Self {
        let (x, y) = bbox.center();
        Point(x, y)
    }
}

/// One slot per frame, `None` where the pig was not seen.
pub type ObjectPath = Vec<Option<Point>>;

/// Paths keyed by object id, in the order the objects were first seen.
pub type Paths = IndexMap<ObjectId, ObjectPath>;

/// The annotation restricted to the frames the prediction covers.
///
/// The result has exactly `len` slots: a longer annotation is truncated, a shorter one is padded
/// with gaps.
pub fn aligned_annotation(annotation: &[Option<Point>], len: usize) -> ObjectPath {
    let mut aligned = annotation.iter().take(len).copied().collect::<Vec<_>>();
    aligned.resize(len, None);
    aligned
}

/// Set `path[frame]`, growing the path with gaps as needed.
pub(crate) fn set_point(path: &mut ObjectPath, frame: usize, point: Point) {
    if path.len() <= frame {
        path.resize(frame + 1, None);
    }
    path[frame] = Some(point);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_annotation_truncates_to_prediction() {
        let annotation = vec![
            Some(Point(1.0, 2.0)),
            Some(Point(3.0, 3.0)),
            Some(Point(9.0, 9.0)),
        ];
        let path = vec![Some(Point(1.0, 2.0)), Some(Point(3.0, 4.0))];

        assert_eq!(
            aligned_annotation(&annotation, path.len()),
            vec![Some(Point(1.0, 2.0)), Some(Point(3.0, 3.0))]
        );
        assert_eq!(annotation.len(), 3);
    }

    #[test]
    fn aligned_annotation_has_exactly_the_prediction_length() {
        let annotation = vec![Some(Point(1.0, 2.0)), None];
        for len in 0..5 {
            assert_eq!(aligned_annotation(&annotation, len).len(), len);
        }
        assert_eq!(aligned_annotation(&[], 0), ObjectPath::new());
        assert_eq!(aligned_annotation(&annotation, 3)[2], None);
    }

    #[test]
    fn points_serialise_as_pairs() -> serde_json::Result<()> {
        let path: ObjectPath = vec![Some(Point(1.5, 2.0)), None];
        let json = serde_json::to_string(&path)?;
        assert_eq!(json, "[[1.5,2.0],null]");
        assert_eq!(serde_json::from_str::<ObjectPath>(&json)?, path);
        Ok(())
    }

    #[test]
    fn set_point_pads_with_gaps() {
        let mut path = ObjectPath::new();
        set_point(&mut path, 2, Point(4.0, 4.0));
        assert_eq!(path, vec![None, None, Some(Point(4.0, 4.0))]);
        set_point(&mut path, 0, Point(1.0, 1.0));
        assert_eq!(path[0], Some(Point(1.0, 1.0)));
    }

    #[test]
    fn distance_between_points() {
        assert_eq!(Point(0.0, 0.0).distance(&Point(3.0, 4.0)), 5.0);
        assert_eq!(Point(2.0, 1.0).x(), 2.0);
        assert_eq!(Point(2.0, 1.0).y(), 1.0);
    }
}
