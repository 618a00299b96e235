use crate::error::{Error, Result};
use image::RgbImage;
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// A video stored as a sequence of frame images.
///
/// Either a directory whose images are the frames in file name order, or a glob pattern such as
/// `videos/15/*.png`.
#[derive(Debug, Clone)]
pub struct Video {
    source: PathBuf,
    frames: Vec<PathBuf>,
}

impl Video {
    pub fn open(source: impl AsRef<Path>) -> Result<Video> {
        let source = source.as_ref();
        if source.is_file() && !is_frame(source) {
            return Err(Error::UnsupportedVideo(source.to_path_buf()));
        }

        let mut frames = if source.is_dir() {
            std::fs::read_dir(source)
                .map_err(Error::data_access(source))?
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(Error::data_access(source))?
                .into_iter()
                .filter(|path| is_frame(path))
                .collect::<Vec<_>>()
        } else {
            let pattern = source.to_string_lossy();
            let paths = glob::glob(&pattern).map_err(|err| Error::DataAccess {
                path: source.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.msg),
            })?;
            paths
                .map(|path| {
                    path.map_err(|err| {
                        let path = err.path().to_path_buf();
                        Error::DataAccess {
                            path,
                            source: err.into(),
                        }
                    })
                })
                .filter_ok(|path| is_frame(path))
                .collect::<Result<Vec<_>>>()?
        };

        if frames.is_empty() {
            if !source.is_dir() && !is_pattern(&source.to_string_lossy()) {
                return Err(Error::DataAccess {
                    path: source.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            return Err(Error::EmptyVideo(source.to_path_buf()));
        }
        frames.sort();
        debug!("{}: {} frames", source.display(), frames.len());

        Ok(Video {
            source: source.to_path_buf(),
            frames,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Visit the first `limit` frames in order.
    ///
    /// Frames are decoded in parallel, `num_cpus` at a time, and handed to `visit` sequentially.
    pub fn for_each_frame<F>(&self, limit: Option<usize>, mut visit: F) -> Result<usize>
    where
        F: FnMut(usize, &RgbImage) -> Result<()>,
    {
        let limit = limit.unwrap_or(usize::MAX).min(self.frames.len());

        self.frames[..limit]
            .iter()
            .enumerate()
            .chunks(num_cpus::get())
            .into_iter()
            .try_for_each(|chunk| {
                let chunk = chunk.collect::<Vec<_>>();
                let decoded = chunk
                    .par_iter()
                    .map(|(index, path)| decode(path).map(|frame| (*index, frame)))
                    .collect::<Result<Vec<_>>>()?;

                decoded
                    .iter()
                    .try_for_each(|(index, frame)| visit(*index, frame))
            })?;

        Ok(limit)
    }
}

pub(crate) fn is_pattern(path: &str) -> bool {
    path.contains(|c| matches!(c, '*' | '?' | '['))
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .map(|extension| {
            let extension = extension.to_string_lossy().to_ascii_lowercase();
            FRAME_EXTENSIONS.contains(&extension.as_str())
        })
        .unwrap_or(false)
}

fn decode(path: &Path) -> Result<RgbImage> {
    let reader = image::io::Reader::open(path).map_err(Error::data_access(path))?;
    let frame = reader.decode().map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(frame.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frames(dir: &Path, count: u8) {
        for index in 0..count {
            RgbImage::from_pixel(4, 4, Rgb([index, 0, 0]))
                .save(dir.join(format!("{index:03}.png")))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
    }

    #[test]
    fn visits_frames_in_order() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 11);

        let video = Video::open(dir.path())?;
        assert_eq!(video.frame_count(), 11);

        let mut seen = vec![];
        let visited = video.for_each_frame(None, |index, frame| {
            seen.push((index, frame.get_pixel(0, 0)[0]));
            Ok(())
        })?;
        assert_eq!(visited, 11);
        assert_eq!(seen, (0..11).map(|i| (i as usize, i)).collect::<Vec<_>>());

        Ok(())
    }

    #[test]
    fn respects_frame_limit_and_glob() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 5);

        let video = Video::open(dir.path().join("*.png"))?;
        assert_eq!(video.frame_count(), 5);
        let mut reds = vec![];
        let visited = video.for_each_frame(Some(3), |_, frame| {
            reds.push(frame.get_pixel(0, 0)[0]);
            Ok(())
        })?;
        assert_eq!(visited, 3);
        assert_eq!(reds, vec![0, 1, 2]);

        Ok(())
    }

    #[test]
    fn video_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("15_nursery_medium_activity_night.mp4");
        std::fs::write(&file, b"not decodable here").unwrap();

        match Video::open(&file) {
            Err(Error::UnsupportedVideo(path)) => assert_eq!(path, file),
            other => panic!("expected an unsupported video, got {other:?}"),
        }
    }

    #[test]
    fn single_frame_file_is_a_video() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 2);

        let video = Video::open(dir.path().join("001.png"))?;
        assert_eq!(video.frame_count(), 1);

        Ok(())
    }

    #[test]
    fn missing_and_empty_videos() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Video::open(dir.path()),
            Err(Error::EmptyVideo(_))
        ));
        assert!(matches!(
            Video::open(dir.path().join("missing")),
            Err(Error::DataAccess { .. })
        ));
    }
}
