use crate::{
    error::{Error, Result},
    path::{ObjectPath, Paths, Point},
};
use indexmap::IndexMap;
use pigtrack::{BoundingBox, ObjectId};
use std::path::Path;

/// Ground truth of one video: per object, one optional box per frame.
///
/// On disk this is a JSON object mapping each object id to an array holding `null` or
/// `[left, top, width, height]` for every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    boxes: IndexMap<ObjectId, Vec<Option<BoundingBox>>>,
}

impl Annotations {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Annotations> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(Error::data_access(path))?;
        Self::parse(&contents).map_err(|reason| Error::MalformedAnnotation {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(contents: &str) -> std::result::Result<Annotations, String> {
        let raw: IndexMap<ObjectId, Vec<Option<[f32; 4]>>> =
            serde_json::from_str(contents).map_err(|err| err.to_string())?;

        let boxes = raw
            .into_iter()
            .map(|(id, frames)| {
                let frames = frames
                    .into_iter()
                    .enumerate()
                    .map(|(frame, tlwh)| {
                        tlwh.map(|[left, top, width, height]| {
                            if !(width >= 0.0 && height >= 0.0) || !(left.is_finite() && top.is_finite()) {
                                Err(format!("invalid box of {id} on frame {frame}"))
                            } else {
                                Ok(BoundingBox::new(left, top, width, height))
                            }
                        })
                        .transpose()
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Ok((id, frames))
            })
            .collect::<std::result::Result<IndexMap<_, _>, String>>()?;

        Ok(Annotations { boxes })
    }

    /// Object ids in file order.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.boxes.keys()
    }

    /// Number of frames covered by the longest annotation.
    pub fn frame_count(&self) -> usize {
        self.boxes.values().map(Vec::len).max().unwrap_or(0)
    }

    /// The annotated boxes of one frame, in file order.
    pub fn frame(&self, frame: usize) -> Vec<(ObjectId, BoundingBox)> {
        self.boxes
            .iter()
            .filter_map(|(id, frames)| {
                frames
                    .get(frame)
                    .copied()
                    .flatten()
                    .map(|bbox| (id.clone(), bbox))
            })
            .collect()
    }

    /// The ground-truth path of every object: the centre of its box on each frame.
    pub fn paths(&self) -> Paths {
        self.boxes
            .iter()
            .map(|(id, frames)| {
                let path: ObjectPath = frames
                    .iter()
                    .map(|bbox| bbox.as_ref().map(Point::from))
                    .collect();
                (id.clone(), path)
            })
            .collect()
    }
}
