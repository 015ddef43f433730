//! Recorded motion timelines.
//!
//! A [`FrameSequence`] is an ordered list of [`Frame`]s; list order is
//! playback order. Ids come from a counter owned by the sequence and are
//! never handed out twice, even after the frame holding one is removed.
//!
//! On disk a sequence is a JSON array of [`FrameRow`]s in playback order.
//! Frames holding NaN or infinite angles can be built and are skipped at
//! playback, but they cannot be saved: JSON has no encoding for them.

use std::{collections::HashSet, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{FrameNotFound, PersistError},
    model::{Angles, FrameId},
};

/// Largest id a stored row may carry. Keeps the counter far from overflow.
pub const MAX_FRAME_ID: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    id: FrameId,
    name: String,
    angles: Angles,
    duration_ms: u64,
}

impl Frame {
    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn angles(&self) -> &Angles {
        &self.angles
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Fields to replace on an existing frame; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameEdit {
    pub name: Option<String>,
    pub angles: Option<Angles>,
    pub duration_ms: Option<u64>,
}

/// Persisted form of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRow {
    pub id: u64,
    pub name: String,
    pub angle0: f64,
    pub angle1: f64,
    pub angle2: f64,
    pub angle3: f64,
    pub angle4: f64,
    pub angle5: f64,
    pub angle6: f64,
    pub duration_ms: u64,
}

impl From<&Frame> for FrameRow {
    fn from(f: &Frame) -> Self {
        let [angle0, angle1, angle2, angle3, angle4, angle5, angle6] = f.angles;
        Self {
            id: f.id.0,
            name: f.name.clone(),
            angle0,
            angle1,
            angle2,
            angle3,
            angle4,
            angle5,
            angle6,
            duration_ms: f.duration_ms,
        }
    }
}

impl From<FrameRow> for Frame {
    fn from(r: FrameRow) -> Self {
        Self {
            id: FrameId(r.id),
            name: r.name,
            angles: [r.angle0, r.angle1, r.angle2, r.angle3, r.angle4, r.angle5, r.angle6],
            duration_ms: r.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    next_id: u64,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, name: impl Into<String>, angles: Angles, duration_ms: u64) -> Frame {
        let id = FrameId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        Frame { id, name: name.into(), angles, duration_ms }
    }

    pub fn append(&mut self, name: impl Into<String>, angles: Angles, duration_ms: u64) -> Frame {
        let frame = self.allocate(name, angles, duration_ms);
        self.frames.push(frame.clone());
        frame
    }

    /// Inserts before `index`; an index past the end appends.
    pub fn insert(
        &mut self,
        index: usize,
        name: impl Into<String>,
        angles: Angles,
        duration_ms: u64,
    ) -> Frame {
        let frame = self.allocate(name, angles, duration_ms);
        let index = index.min(self.frames.len());
        self.frames.insert(index, frame.clone());
        frame
    }

    pub fn remove(&mut self, id: FrameId) -> Result<Frame, FrameNotFound> {
        let index = self.position(id).ok_or(FrameNotFound(id))?;
        Ok(self.frames.remove(index))
    }

    /// Moves the frame to `new_index` (clamped to the last slot).
    pub fn move_to(&mut self, id: FrameId, new_index: usize) -> Result<(), FrameNotFound> {
        let from = self.position(id).ok_or(FrameNotFound(id))?;
        let frame = self.frames.remove(from);
        let to = new_index.min(self.frames.len());
        self.frames.insert(to, frame);
        Ok(())
    }

    pub fn update(&mut self, id: FrameId, edit: FrameEdit) -> Result<&Frame, FrameNotFound> {
        let frame = self
            .frames
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(FrameNotFound(id))?;
        if let Some(name) = edit.name {
            frame.name = name;
        }
        if let Some(angles) = edit.angles {
            frame.angles = angles;
        }
        if let Some(duration_ms) = edit.duration_ms {
            frame.duration_ms = duration_ms;
        }
        Ok(frame)
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn position(&self, id: FrameId) -> Option<usize> {
        self.frames.iter().position(|f| f.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drops every frame. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn next_id(&self) -> FrameId {
        FrameId(self.next_id)
    }

    pub fn serialize(&self) -> Vec<FrameRow> {
        self.frames.iter().map(FrameRow::from).collect()
    }

    fn check_storable(&self) -> Result<(), PersistError> {
        match self.frames.iter().find(|f| f.angles.iter().any(|a| !a.is_finite())) {
            Some(f) => Err(PersistError::NonFiniteAngle(f.id)),
            None => Ok(()),
        }
    }

    pub fn deserialize(rows: Vec<FrameRow>) -> Result<Self, PersistError> {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut next_id = 0;
        let mut frames = Vec::with_capacity(rows.len());
        for row in rows {
            if row.id > MAX_FRAME_ID {
                return Err(PersistError::IdOutOfRange(FrameId(row.id)));
            }
            if !seen.insert(row.id) {
                return Err(PersistError::DuplicateId(FrameId(row.id)));
            }
            next_id = next_id.max(row.id + 1);
            frames.push(Frame::from(row));
        }
        Ok(Self { frames, next_id })
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        self.check_storable()?;
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Self::deserialize(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: Angles = [90.0, 170.0, 35.0, 90.0, 90.0, 90.0, 0.0];

    fn ids(seq: &FrameSequence) -> Vec<u64> {
        seq.iter().map(|f| f.id().0).collect()
    }

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut seq = FrameSequence::new();
        let a = seq.append("a", HOME, 100);
        let b = seq.append("b", HOME, 100);
        seq.remove(b.id()).unwrap();
        let c = seq.append("c", HOME, 100);
        assert!(a.id() < b.id() && b.id() < c.id());
        assert_eq!(ids(&seq), vec![0, 2]);
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut seq = FrameSequence::new();
        assert_eq!(seq.remove(FrameId(4)), Err(FrameNotFound(FrameId(4))));
        assert_eq!(seq.move_to(FrameId(4), 0), Err(FrameNotFound(FrameId(4))));
    }

    #[test]
    fn move_to_reorders_without_changing_content() {
        let mut seq = FrameSequence::new();
        let a = seq.append("a", HOME, 100);
        seq.append("b", HOME, 200);
        seq.append("c", HOME, 300);
        seq.move_to(a.id(), 2).unwrap();
        assert_eq!(ids(&seq), vec![1, 2, 0]);
        assert_eq!(seq.get(a.id()), Some(&a));

        seq.move_to(a.id(), 99).unwrap();
        assert_eq!(ids(&seq), vec![1, 2, 0]);
        seq.move_to(a.id(), 0).unwrap();
        assert_eq!(ids(&seq), vec![0, 1, 2]);
    }

    #[test]
    fn insert_places_frame_and_takes_fresh_id() {
        let mut seq = FrameSequence::new();
        seq.append("a", HOME, 100);
        seq.append("b", HOME, 100);
        let mid = seq.insert(1, "mid", HOME, 50);
        assert_eq!(mid.id(), FrameId(2));
        assert_eq!(ids(&seq), vec![0, 2, 1]);
        seq.insert(10, "end", HOME, 50);
        assert_eq!(ids(&seq), vec![0, 2, 1, 3]);
    }

    #[test]
    fn update_edits_in_place() {
        let mut seq = FrameSequence::new();
        let a = seq.append("a", HOME, 100);
        let edited = seq
            .update(a.id(), FrameEdit { name: Some("wave".into()), duration_ms: Some(750), ..FrameEdit::default() })
            .unwrap()
            .clone();
        assert_eq!(edited.id(), a.id());
        assert_eq!(edited.name(), "wave");
        assert_eq!(edited.duration_ms(), 750);
        assert_eq!(edited.angles(), &HOME);
    }

    #[test]
    fn clear_keeps_counter() {
        let mut seq = FrameSequence::new();
        seq.append("a", HOME, 100);
        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.append("b", HOME, 100).id(), FrameId(1));
    }

    #[test]
    fn json_rows_use_column_names() {
        let mut seq = FrameSequence::new();
        seq.append("reach", HOME, 1500);
        let json = seq.to_json().unwrap();
        for key in ["\"id\"", "\"name\"", "\"angle0\"", "\"angle6\"", "\"durationMs\""] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn loaded_sequence_continues_after_highest_id() {
        let json = r#"[
            {"id": 7, "name": "b", "angle0": 1, "angle1": 2, "angle2": 3, "angle3": 4,
             "angle4": 5, "angle5": 6, "angle6": 7, "durationMs": 20},
            {"id": 3, "name": "a", "angle0": 0, "angle1": 0, "angle2": 0, "angle3": 0,
             "angle4": 0, "angle5": 0, "angle6": 0, "durationMs": 10}
        ]"#;
        let mut seq = FrameSequence::from_json(json).unwrap();
        assert_eq!(ids(&seq), vec![7, 3]);
        assert_eq!(seq.frames()[0].angles(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(seq.append("c", HOME, 0).id(), FrameId(8));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let row = FrameRow::from(&FrameSequence::new().append("a", HOME, 1));
        let err = FrameSequence::deserialize(vec![row.clone(), row]).unwrap_err();
        assert_eq!(err, PersistError::DuplicateId(FrameId(0)));
    }

    fn row_json(id: u64) -> String {
        format!(
            r#"[{{"id": {id}, "name": "x", "angle0": 0, "angle1": 0, "angle2": 0, "angle3": 0,
                 "angle4": 0, "angle5": 0, "angle6": 0, "durationMs": 1}}]"#
        )
    }

    #[test]
    fn ids_past_the_storable_range_are_rejected() {
        let err = FrameSequence::from_json(&row_json(u64::MAX)).unwrap_err();
        assert_eq!(err, PersistError::IdOutOfRange(FrameId(u64::MAX)));
        assert!(FrameSequence::from_json(&row_json(MAX_FRAME_ID + 1)).is_err());
    }

    #[test]
    fn highest_storable_id_still_allows_appending() {
        let mut seq = FrameSequence::from_json(&row_json(MAX_FRAME_ID)).unwrap();
        let next = seq.append("b", HOME, 1);
        assert_eq!(next.id(), FrameId(MAX_FRAME_ID + 1));
        assert_eq!(ids(&seq), vec![MAX_FRAME_ID, MAX_FRAME_ID + 1]);
    }

    #[test]
    fn non_finite_angles_cannot_be_saved() {
        let mut seq = FrameSequence::new();
        seq.append("ok", HOME, 1);
        let mut bad = HOME;
        bad[3] = f64::NAN;
        let nan = seq.append("nan", bad, 1);
        assert_eq!(seq.to_json(), Err(PersistError::NonFiniteAngle(nan.id())));

        seq.update(nan.id(), FrameEdit { angles: Some(HOME), ..FrameEdit::default() }).unwrap();
        let reloaded = FrameSequence::from_json(&seq.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, seq);
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        assert!(matches!(FrameSequence::from_json("{not json"), Err(PersistError::Format(_))));
    }

    #[test]
    fn save_and_load_through_a_file() {
        let mut seq = FrameSequence::new();
        seq.append("a", HOME, 100);
        seq.append("b", [10.0; 7], 250);
        let path = std::env::temp_dir().join(format!("frames-{}.json", std::process::id()));
        seq.save(&path).unwrap();
        let loaded = FrameSequence::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, seq);
    }
}
