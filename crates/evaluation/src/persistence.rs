use crate::{
    error::{Error, Result},
    path::Paths,
    scores::Scores,
};
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const ANNOTATIONS_FILE: &str = "annotations.json";
pub const PATHS_FILE: &str = "out.json";
pub const SCORES_FILE: &str = "scores.json";

/// Two space indentation with `,` and `:` separators and no space after the colon.
pub struct IndentedFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl<'a> IndentedFormatter<'a> {
    pub fn new() -> Self {
        IndentedFormatter {
            pretty: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl<'a> Default for IndentedFormatter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Formatter for IndentedFormatter<'a> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}

/// Serialise compactly: no whitespace at all.
pub fn to_compact_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    serde_json::to_writer(writer, value)?;
    Ok(())
}

/// Serialise with [`IndentedFormatter`].
pub fn to_indented_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(writer, IndentedFormatter::new());
    value.serialize(&mut serializer)?;
    Ok(())
}

/// The timestamped directory a run writes its results to.
#[derive(Debug, Clone)]
pub struct ResultsDir {
    path: PathBuf,
}

impl ResultsDir {
    /// Create `<root>/<timestamp>-<tag>`.
    ///
    /// The root is created when missing. The directory itself must not exist yet: a second run
    /// within the same second fails with [`Error::OutputCollision`] instead of overwriting.
    pub fn create(root: impl AsRef<Path>, tag: &str, now: NaiveDateTime) -> Result<ResultsDir> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(Error::write(root))?;

        let path = root.join(format!("{}-{tag}", now.format(TIMESTAMP_FORMAT)));
        match std::fs::create_dir(&path) {
            Ok(()) => {
                info!("writing results to {}", path.display());
                Ok(ResultsDir { path })
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::OutputCollision(path))
            }
            Err(source) => Err(Error::Write { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `annotations.json`, `out.json` and `scores.json`.
    ///
    /// All three are serialised to temporary files first and only renamed into place once every
    /// one of them was written. When a rename fails the files already renamed are removed again,
    /// so a failed write leaves none of the three behind.
    pub fn write(&self, annotations: &Paths, paths: &Paths, scores: &Scores) -> Result<()> {
        let staged = [
            (ANNOTATIONS_FILE, self.stage(|file| to_compact_writer(file, annotations))?),
            (PATHS_FILE, self.stage(|file| to_compact_writer(file, paths))?),
            (SCORES_FILE, self.stage(|file| to_indented_writer(file, scores))?),
        ];

        let mut persisted: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (name, file) in staged {
            let target = self.path.join(name);
            if let Err(err) = file.persist(&target) {
                for done in &persisted {
                    if let Err(remove) = std::fs::remove_file(done) {
                        warn!("could not remove {}: {remove}", done.display());
                    }
                }
                return Err(Error::Write {
                    path: target,
                    source: err.error,
                });
            }
            persisted.push(target);
        }
        info!("wrote {}, {} and {}", ANNOTATIONS_FILE, PATHS_FILE, SCORES_FILE);

        Ok(())
    }

    fn stage<F>(&self, serialize: F) -> Result<NamedTempFile>
    where
        F: FnOnce(&mut io::BufWriter<&mut NamedTempFile>) -> Result<()>,
    {
        let mut file = NamedTempFile::new_in(&self.path).map_err(Error::write(&self.path))?;
        {
            let mut writer = io::BufWriter::new(&mut file);
            serialize(&mut writer)?;
            writer.flush().map_err(Error::write(&self.path))?;
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path::Point, scores::ObjectScore};
    use chrono::NaiveDate;

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, second)
            .unwrap()
    }

    #[test]
    fn names_directories_by_timestamp_and_tag() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        let experiments = root.path().join("experiments");

        let first = ResultsDir::create(&experiments, "video15", at(5))?;
        assert_eq!(first.path(), experiments.join("2024-03-01_12-30-05-video15"));
        assert!(first.path().is_dir());

        let second = ResultsDir::create(&experiments, "video15", at(6))?;
        assert_ne!(first.path(), second.path());

        let collision = ResultsDir::create(&experiments, "video15", at(6));
        assert!(matches!(collision, Err(Error::OutputCollision(_))));

        Ok(())
    }

    #[test]
    fn indented_formatter_layout() -> Result<()> {
        let mut value = indexmap::IndexMap::new();
        value.insert("b", vec![1, 2]);
        value.insert("a", vec![]);

        let mut out = vec![];
        to_indented_writer(&mut out, &value)?;
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"b\":[\n    1,\n    2\n  ],\n  \"a\":[]\n}"
        );

        let mut out = vec![];
        to_compact_writer(&mut out, &value)?;
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"b":[1,2],"a":[]}"#);

        Ok(())
    }

    #[test]
    fn writes_all_three_files() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        let dir = ResultsDir::create(root.path(), "video15", at(0))?;

        let mut paths = Paths::new();
        paths.insert("pig2".to_string(), vec![Some(Point(1.0, 2.0)), None]);
        paths.insert("pig1".to_string(), vec![]);
        let mut scores = Scores::new();
        for (obj_id, path) in &paths {
            scores.insert(obj_id.clone(), ObjectScore::compare(path, path, 1.0, 10, true));
        }

        dir.write(&paths, &paths, &scores)?;

        let out = std::fs::read_to_string(dir.path().join(PATHS_FILE)).unwrap();
        assert_eq!(out, r#"{"pig2":[[1.0,2.0],null],"pig1":[]}"#);
        let read_back: Paths = serde_json::from_str(&out)?;
        assert_eq!(read_back, paths);

        let scores_json = std::fs::read_to_string(dir.path().join(SCORES_FILE)).unwrap();
        assert!(scores_json.starts_with("{\n  \"pig2\":{\n    \"frames\":["));
        let read_back: Scores = serde_json::from_str(&scores_json)?;
        assert_eq!(read_back, scores);

        // nothing but the three results is left in the directory
        let mut entries = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, vec![ANNOTATIONS_FILE, PATHS_FILE, SCORES_FILE]);

        Ok(())
    }

    #[test]
    fn failed_write_leaves_no_results() -> Result<()> {
        let root = tempfile::tempdir().unwrap();
        let dir = ResultsDir::create(root.path(), "video15", at(0))?;

        // the last rename cannot replace a non-empty directory
        let blocker = dir.path().join(SCORES_FILE);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"").unwrap();

        let mut paths = Paths::new();
        paths.insert("pig1".to_string(), vec![Some(Point(1.0, 2.0))]);
        let mut scores = Scores::new();
        scores.insert(
            "pig1".to_string(),
            ObjectScore::compare(&paths["pig1"], &paths["pig1"], 1.0, 10, true),
        );

        let result = dir.write(&paths, &paths, &scores);
        assert!(matches!(result, Err(Error::Write { ref path, .. }) if *path == blocker));

        let entries = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(entries, vec![SCORES_FILE]);
        assert!(blocker.join("keep").is_file());

        Ok(())
    }
}
