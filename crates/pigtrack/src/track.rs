use crate::*;

/// Identity of a tracked object, e.g. a pig name such as `"pig1"` or a numeric id rendered as text.
pub type ObjectId = String;

/// Enumeration type for the single target track state:
///
/// - `Tracked` tracks were matched (or created) on the latest frame.
/// - `Lost` tracks were not matched on the latest frame and wait to be re-identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tracked,
    Lost,
}

/// Enumeration type for the source of the match
///
/// * `Appearance` means matched via the siamese embedding gallery.
/// * `Fused` means matched via appearance weighted with the overlap of the last known location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchSource {
    Appearance { distance: f32 },
    Fused { distance: f32 },
}

/// A single target track. The motion model is constant position: the track stays where it was last observed.
#[derive(Debug, Clone)]
pub struct Track {
    /// The identity of the track.
    id: ObjectId,
    /// Creation order, used to keep track iteration deterministic.
    serial: usize,
    /// The current track state.
    state: TrackState,
    /// The last observed bounding box.
    bbox: BoundingBox,
    /// The latest matched detection source.
    match_source: Option<MatchSource>,
    /// Frame index of the last measurement update.
    last_seen_frame: usize,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Track {
    /// Returns a new Track
    ///
    /// # Parameters
    ///
    /// * `id`: The identity of the track.
    /// * `serial`: Creation order of the track.
    /// * `detection`: The detection this track originates from.
    /// * `frame`: The frame index of `detection`.
    pub fn new(id: ObjectId, serial: usize, detection: &Detection, frame: usize) -> Track {
        Track {
            id,
            serial,
            state: TrackState::Tracked,
            bbox: *detection.bbox(),
            match_source: None,
            last_seen_frame: frame,
        }
    }

    /// Return the identifier of the track
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Return the creation order of the track
    pub fn serial(&self) -> usize {
        self.serial
    }

    /// Return the last observed bounding box
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Return the match source of the track
    pub fn match_source(&self) -> &Option<MatchSource> {
        &self.match_source
    }

    /// Return the frame index of the last measurement update
    pub fn last_seen_frame(&self) -> usize {
        self.last_seen_frame
    }

    /// Perform a measurement update.
    ///
    /// # Parameters
    ///
    /// * `detection`: The associated detection.
    /// * `frame`: The frame index of `detection`.
    /// * `match_source`: How the detection was associated.
    pub fn update(&mut self, detection: &Detection, frame: usize, match_source: MatchSource) {
        self.bbox = *detection.bbox();
        self.match_source = Some(match_source);
        self.last_seen_frame = frame;
        self.state = TrackState::Tracked;
    }

    /// Mark this track as missed.
    pub fn mark_lost(&mut self) {
        self.state = TrackState::Lost;
    }

    /// Returns true if this track was matched on the latest frame.
    pub fn is_tracked(&self) -> bool {
        matches!(self.state, TrackState::Tracked)
    }

    /// Returns true if this track is waiting to be re-identified.
    pub fn is_lost(&self) -> bool {
        matches!(self.state, TrackState::Lost)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    fn detection(x: f32) -> Detection {
        Detection::new(BoundingBox::new(x, 0.0, 10.0, 10.0), 1.0, None)
    }

    #[test]
    fn new_track_is_tracked() {
        let track = Track::new("pig1".to_string(), 3, &detection(0.0), 7);

        assert!(track.is_tracked());
        assert_eq!(track.serial(), 3);
        assert_eq!(track.last_seen_frame(), 7);
        assert_eq!(track.match_source(), &None);
        assert_eq!(track.bbox(), &BoundingBox::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn lost_then_update() {
        let mut track = Track::new("pig1".to_string(), 0, &detection(0.0), 0);
        track.mark_lost();
        assert!(track.is_lost());
        assert!(!track.is_tracked());

        track.update(&detection(5.0), 2, MatchSource::Appearance { distance: 0.1 });

        assert!(track.is_tracked());
        assert_eq!(track.last_seen_frame(), 2);
        assert_eq!(track.bbox().x(), 5.0);
        assert_eq!(
            track.match_source(),
            &Some(MatchSource::Appearance { distance: 0.1 })
        );
    }
}
