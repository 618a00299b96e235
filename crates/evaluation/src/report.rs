use crate::{
    error::{Error, Result},
    path::{aligned_annotation, Paths, Point},
    scores::{PartScore, Scores},
};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use log::{debug, warn};
use pigtrack::ObjectId;
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

const ANNOTATION_COLOUR: Rgb<u8> = Rgb([0, 170, 0]);
const PREDICTION_COLOUR: Rgb<u8> = Rgb([220, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const UNSCORED: Rgb<u8> = Rgb([190, 190, 190]);

const PLOT_SIZE: f32 = 512.0;
const MARGIN: f32 = 16.0;
const STRIP_HEIGHT: u32 = 16;
const PLACEHOLDER_SIZE: u32 = 64;

#[derive(Debug, Serialize)]
struct ComparisonRow {
    frame: usize,
    annotation_x: Option<f32>,
    annotation_y: Option<f32>,
    predicted_x: Option<f32>,
    predicted_y: Option<f32>,
    distance: Option<f32>,
    part: Option<usize>,
}

const CSV_HEADER: [&str; 7] = [
    "frame",
    "annotation_x",
    "annotation_y",
    "predicted_x",
    "predicted_y",
    "distance",
    "part",
];

/// Object ids become file names: anything but ASCII letters, digits, `-` and `_` is replaced.
pub fn file_stem(obj_id: &str) -> String {
    let stem = obj_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// One distinct file stem per object, in order.
///
/// Ids that sanitise to a stem already handed out get the first free `-<n>` suffix, so
/// `"pig 1"` and `"pig_1"` become `pig_1` and `pig_1-1`.
pub fn report_stems<'a>(obj_ids: impl IntoIterator<Item = &'a ObjectId>) -> Vec<String> {
    let mut taken = HashSet::new();

    obj_ids
        .into_iter()
        .map(|obj_id| {
            let stem = file_stem(obj_id);
            let unique = (0..)
                .map(|n| {
                    if n == 0 {
                        stem.clone()
                    } else {
                        format!("{stem}-{n}")
                    }
                })
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            if unique != stem {
                warn!("{obj_id}: {stem} is taken, writing its report as {unique}");
            }
            taken.insert(unique.clone());
            unique
        })
        .collect()
}

/// Write the comparison of one object's predicted path with its annotation.
///
/// Produces `<obj_id>.png`, both paths drawn over their joint extent (annotation green, prediction
/// red) above a strip with one cell per part shaded from red to green by its score, and
/// `<obj_id>.csv` with one row per frame. `annotation` is expected to be aligned to `path`.
pub fn print_path_comparison(
    out_dir: &Path,
    annotation: &[Option<Point>],
    path: &[Option<Point>],
    obj_id: &str,
    interval: usize,
    parts: &[PartScore],
) -> Result<()> {
    write_comparison(
        out_dir,
        &file_stem(obj_id),
        annotation,
        path,
        obj_id,
        interval,
        parts,
    )?;
    Ok(())
}

fn write_comparison(
    out_dir: &Path,
    stem: &str,
    annotation: &[Option<Point>],
    path: &[Option<Point>],
    obj_id: &str,
    interval: usize,
    parts: &[PartScore],
) -> Result<PathBuf> {
    if annotation.len() != path.len() {
        warn!(
            "{obj_id}: annotation has {} frames, prediction {}",
            annotation.len(),
            path.len()
        );
    }

    let image_path = out_dir.join(format!("{stem}.png"));
    let plot = plot(annotation, path, parts);
    plot.save(&image_path).map_err(|source| Error::Image {
        path: image_path.clone(),
        source,
    })?;

    let csv_path = out_dir.join(format!("{stem}.csv"));
    write_table(&csv_path, annotation, path, interval, parts)?;

    debug!("{obj_id}: wrote {} and {}", image_path.display(), csv_path.display());
    Ok(image_path)
}

/// Write the comparison report of every annotated object, in parallel.
///
/// Every object gets its own files, named by [`report_stems`].
///
/// # Returns
///
/// The plot of each object, in annotation order.
pub fn write_reports(
    out_dir: &Path,
    annotations: &Paths,
    paths: &Paths,
    scores: &Scores,
) -> Result<Vec<PathBuf>> {
    let objects = annotations
        .iter()
        .zip(report_stems(annotations.keys()))
        .collect::<Vec<_>>();

    objects
        .par_iter()
        .map(|((obj_id, annotation), stem)| {
            let missing = |missing_from| Error::MissingObject {
                obj_id: obj_id.to_string(),
                missing_from,
            };
            let path = paths.get(*obj_id).ok_or_else(|| missing("paths"))?;
            let score = scores.get(*obj_id).ok_or_else(|| missing("scores"))?;

            write_comparison(
                out_dir,
                stem,
                &aligned_annotation(annotation, path.len()),
                path,
                obj_id,
                score.intervals.interval,
                &score.intervals.parts,
            )
        })
        .collect()
}

fn write_table(
    csv_path: &Path,
    annotation: &[Option<Point>],
    path: &[Option<Point>],
    interval: usize,
    parts: &[PartScore],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(csv_path)?;
    writer.write_record(CSV_HEADER)?;

    for (frame, predicted) in path.iter().enumerate() {
        let expected = annotation.get(frame).copied().flatten();
        let distance = match (&expected, predicted) {
            (Some(expected), Some(predicted)) => Some(expected.distance(predicted)),
            _ => None,
        };
        let part = (interval > 0 && !parts.is_empty()).then(|| frame / interval);

        writer.serialize(ComparisonRow {
            frame,
            annotation_x: expected.map(|point| point.x()),
            annotation_y: expected.map(|point| point.y()),
            predicted_x: predicted.map(|point| point.x()),
            predicted_y: predicted.map(|point| point.y()),
            distance,
            part,
        })?;
    }

    writer.flush().map_err(Error::write(csv_path))
}

fn score_colour(score: f64) -> Rgb<u8> {
    let score = score.clamp(0.0, 1.0);
    Rgb([
        (220.0 * (1.0 - score)) as u8,
        (170.0 * score) as u8,
        0,
    ])
}

fn plot(annotation: &[Option<Point>], path: &[Option<Point>], parts: &[PartScore]) -> RgbImage {
    let points = annotation.iter().chain(path).flatten().collect::<Vec<_>>();
    if points.is_empty() {
        return RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, BACKGROUND);
    }

    let min_x = points.iter().map(|point| point.x()).fold(f32::MAX, f32::min);
    let max_x = points.iter().map(|point| point.x()).fold(f32::MIN, f32::max);
    let min_y = points.iter().map(|point| point.y()).fold(f32::MAX, f32::min);
    let max_y = points.iter().map(|point| point.y()).fold(f32::MIN, f32::max);

    let extent = (max_x - min_x).max(max_y - min_y).max(1.0);
    let scale = PLOT_SIZE / extent;
    let width = ((max_x - min_x) * scale + 2.0 * MARGIN).ceil().max(PLACEHOLDER_SIZE as f32) as u32;
    let plot_height = ((max_y - min_y) * scale + 2.0 * MARGIN).ceil() as u32;

    let mut canvas = RgbImage::from_pixel(width, plot_height + STRIP_HEIGHT, BACKGROUND);
    let project = |point: &Point| {
        (
            (point.x() - min_x) * scale + MARGIN,
            (point.y() - min_y) * scale + MARGIN,
        )
    };

    for (series, colour) in [(annotation, ANNOTATION_COLOUR), (path, PREDICTION_COLOUR)] {
        series
            .windows(2)
            .filter_map(|pair| pair[0].zip(pair[1]))
            .for_each(|(from, to)| {
                draw_line_segment_mut(&mut canvas, project(&from), project(&to), colour)
            });
        series.iter().flatten().for_each(|point| {
            let (x, y) = project(point);
            draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), 2, colour);
        });
    }

    // one cell per part along the bottom
    let frames = parts.last().map(|part| part.end).unwrap_or(0);
    if frames > 0 {
        for part in parts {
            let x0 = part.start as f32 / frames as f32 * width as f32;
            let x1 = part.end as f32 / frames as f32 * width as f32;
            let colour = if part.annotated == 0 {
                UNSCORED
            } else {
                score_colour(part.score)
            };
            let cell_width = ((x1 - x0).round() as u32).max(1);
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(x0.round() as i32, plot_height as i32).of_size(cell_width, STRIP_HEIGHT),
                colour,
            );
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::ObjectScore;

    fn p(x: f32, y: f32) -> Option<Point> {
        Some(Point(x, y))
    }

    #[test]
    fn sanitises_file_names() {
        assert_eq!(file_stem("pig1"), "pig1");
        assert_eq!(file_stem("../pig 2"), "___pig_2");
        assert_eq!(file_stem(""), "_");
    }

    #[test]
    fn writes_image_and_table() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let annotation = vec![p(10.0, 10.0), p(20.0, 10.0), None];
        let path = vec![p(10.0, 12.0), None, p(30.0, 10.0)];
        let score = ObjectScore::compare(&annotation, &path, 5.0, 2, true);

        print_path_comparison(
            dir.path(),
            &annotation,
            &path,
            "pig1",
            2,
            &score.intervals.parts,
        )?;

        let image = image::open(dir.path().join("pig1.png")).unwrap().to_rgb8();
        // 20 px wide extent scaled to the plot size, so the 2 px tall extent becomes 51.2 px
        assert_eq!(image.width(), 544);
        assert_eq!(image.height() - STRIP_HEIGHT, 84);
        // first part: one of two annotated frames matched
        assert_eq!(
            image.get_pixel(0, image.height() - 1),
            &score_colour(0.5)
        );

        let table = std::fs::read_to_string(dir.path().join("pig1.csv")).unwrap();
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "frame,annotation_x,annotation_y,predicted_x,predicted_y,distance,part",
                "0,10.0,10.0,10.0,12.0,2.0,0",
                "1,20.0,10.0,,,,0",
                "2,,,30.0,10.0,,1",
            ]
        );

        Ok(())
    }

    #[test]
    fn empty_path_gives_placeholders() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        print_path_comparison(dir.path(), &[], &[], "pig7", 10, &[])?;

        let image = image::open(dir.path().join("pig7.png")).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));

        let table = std::fs::read_to_string(dir.path().join("pig7.csv")).unwrap();
        assert_eq!(
            table.trim_end(),
            "frame,annotation_x,annotation_y,predicted_x,predicted_y,distance,part"
        );

        Ok(())
    }

    #[test]
    fn stems_are_distinct() {
        let ids = ["pig 1", "pig_1", "pig_1-1", "pig2"].map(String::from);
        assert_eq!(
            report_stems(&ids),
            vec!["pig_1", "pig_1-1", "pig_1-1-1", "pig2"]
        );
    }

    #[test]
    fn colliding_ids_keep_their_own_reports() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let mut annotations = Paths::new();
        annotations.insert("pig 1".to_string(), vec![p(1.0, 1.0), p(2.0, 1.0)]);
        annotations.insert("pig_1".to_string(), vec![]);

        let mut scores = Scores::new();
        for (obj_id, path) in &annotations {
            scores.insert(obj_id.clone(), ObjectScore::compare(path, path, 1.0, 10, true));
        }

        let plots = write_reports(dir.path(), &annotations, &annotations, &scores)?;
        assert_eq!(
            plots,
            vec![dir.path().join("pig_1.png"), dir.path().join("pig_1-1.png")]
        );

        let mut entries = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, vec!["pig_1-1.csv", "pig_1-1.png", "pig_1.csv", "pig_1.png"]);

        let first = std::fs::read_to_string(dir.path().join("pig_1.csv")).unwrap();
        assert_eq!(first.lines().count(), 1 + 2);
        let second = std::fs::read_to_string(dir.path().join("pig_1-1.csv")).unwrap();
        assert_eq!(second.lines().count(), 1);

        Ok(())
    }

    #[test]
    fn reports_need_every_object() {
        let dir = tempfile::tempdir().unwrap();
        let mut annotations = Paths::new();
        annotations.insert("pig1".to_string(), vec![p(1.0, 1.0)]);

        let result = write_reports(dir.path(), &annotations, &Paths::new(), &Scores::new());
        assert!(matches!(result, Err(Error::MissingObject { .. })));
    }
}
