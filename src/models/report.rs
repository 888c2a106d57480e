//! Picture report record and its wire form.
//!
//! A report names one captured-and-classified picture by `(origin, index)`.
//! On the wire it travels as a JSON object tagged with `REPORT_TYPE_TAG`,
//! addressed from the mesh node id to the collection point.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::Score;

/// Type tags below 30 belong to the mesh itself.
pub const REPORT_TYPE_TAG: u8 = 31;

/// Origin identifier for a mesh node: its lowest four decimal digits.
pub fn node_prefix(node_id: u32) -> u32 {
    node_id % 10_000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureReport {
    pub origin: u32,
    pub index: u32,
    pub score: Score,
}

impl PictureReport {
    pub fn new(origin: u32, index: u32, score: Score) -> Self {
        Self {
            origin,
            index,
            score,
        }
    }

    /// `<origin>_<index>.jpg`, also the picture's file name on storage.
    pub fn display_name(&self) -> String {
        picture_name(self.origin, self.index)
    }
}

pub(crate) fn picture_name(origin: u32, index: u32) -> String {
    format!("{origin}_{index}.jpg")
}

// Identity is the (origin, index) pair; the score is payload.
impl PartialEq for PictureReport {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.index == other.index
    }
}

impl Eq for PictureReport {}

impl Hash for PictureReport {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.index.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPackage {
    #[serde(rename = "type")]
    pub type_tag: u8,
    pub from: u32,
    pub dest: u32,
    pub node_prefix: u32,
    pub picture_index: u32,
    pub score: f32,
}

impl ReportPackage {
    pub fn new(from: u32, dest: u32, report: &PictureReport) -> Self {
        Self {
            type_tag: REPORT_TYPE_TAG,
            from,
            dest,
            node_prefix: report.origin,
            picture_index: report.index,
            score: report.score.value(),
        }
    }

    pub fn report(&self) -> PictureReport {
        PictureReport::new(self.node_prefix, self.picture_index, Score::new(self.score))
    }

    pub fn full_picture_name(&self) -> String {
        picture_name(self.node_prefix, self.picture_index)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_prefix_keeps_lowest_four_digits() {
        assert_eq!(node_prefix(3_177_562_153), 2153);
        assert_eq!(node_prefix(42), 42);
    }

    #[test]
    fn identity_ignores_score() {
        let a = PictureReport::new(2153, 7, Score::new(0.9));
        let b = PictureReport::new(2153, 7, Score::new(0.6));
        assert_eq!(a, b);
        assert_ne!(a, PictureReport::new(2153, 8, Score::new(0.9)));
        assert_eq!(a.display_name(), "2153_7.jpg");
    }

    #[test]
    fn package_serializes_mesh_field_names() {
        let report = PictureReport::new(2153, 12, Score::new(0.75));
        let package = ReportPackage::new(3_177_562_153, 1_000_001, &report);
        let value: serde_json::Value =
            serde_json::from_slice(&package.to_bytes().unwrap()).unwrap();

        assert_eq!(value["type"], 31);
        assert_eq!(value["nodePrefix"], 2153);
        assert_eq!(value["pictureIndex"], 12);
        assert_eq!(value["dest"], 1_000_001);
        assert_eq!(package.report(), report);
    }
}
