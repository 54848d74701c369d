//! Per-image outcomes and the end-of-run report built from them.

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::Detection;

/// Objects the run is expected to find somewhere in the input set. Used only
/// for the coverage report, never for filtering.
pub const EXPECTED_OBJECTS: &[&str] = &[
    "airplane", "banana", "bench", "bird", "boat", "bowl", "broccoli", "bus", "car", "cat",
    "chair", "clock", "couch", "dining table", "dog", "elephant", "fire hydrant", "fork",
    "giraffe", "handbag", "horse", "person", "pizza", "potted plant", "remote", "sheep",
    "traffic light", "truck", "zebra", "leopard", "robot", "firearm", "tank", "tie", "tv",
    "phone", "cup", "keyboard", "mouse", "chicken", "squirrel", "bed", "pillow", "parsley",
    "knife",
];

pub(crate) const RULE: &str =
    "================================================================================";

#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    Detected(Vec<Detection>),
    Empty,
    Errored(String),
}

/// What happened to one input image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutcome {
    pub filename: String,
    pub status: ImageStatus,
}

impl ImageOutcome {
    /// An outcome with at least one detection; an empty list is recorded as
    /// [`ImageStatus::Empty`].
    pub fn detected(filename: impl Into<String>, detections: Vec<Detection>) -> Self {
        let status = if detections.is_empty() {
            ImageStatus::Empty
        } else {
            ImageStatus::Detected(detections)
        };
        Self {
            filename: filename.into(),
            status,
        }
    }

    pub fn empty(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: ImageStatus::Empty,
        }
    }

    pub fn errored(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: ImageStatus::Errored(message.into()),
        }
    }

    pub fn detections(&self) -> &[Detection] {
        match &self.status {
            ImageStatus::Detected(detections) => detections,
            _ => &[],
        }
    }

    /// One line of the detailed results section.
    pub fn result_line(&self) -> String {
        match &self.status {
            ImageStatus::Detected(detections) => format!(
                "✓ {}: {}",
                self.filename,
                detections.iter().map(Detection::short_description).join(", ")
            ),
            ImageStatus::Empty => format!("❌ {}: No objects detected", self.filename),
            ImageStatus::Errored(message) => format!("❌ {}: Error - {message}", self.filename),
        }
    }
}

/// Set of labels seen across a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedLabels(BTreeSet<String>);

impl DetectedLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: &str) {
        if !self.0.contains(label) {
            self.0.insert(label.to_string());
        }
    }

    /// Record every label of `detections`.
    pub fn extend<'a>(&mut self, detections: impl IntoIterator<Item = &'a Detection>) {
        for detection in detections {
            self.record(&detection.label);
        }
    }

    fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Labels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Expected labels that were never seen, sorted.
    pub fn missing_from(&self, expected: &[&str]) -> Vec<String> {
        expected
            .iter()
            .filter(|label| !self.contains(label))
            .map(|label| label.to_string())
            .sorted()
            .dedup()
            .collect()
    }

    /// Seen labels that are not in `expected`, sorted.
    pub fn unexpected_against(&self, expected: &[&str]) -> Vec<String> {
        self.iter()
            .filter(|label| !expected.contains(label))
            .map(str::to_string)
            .collect()
    }
}

impl<'a> FromIterator<&'a ImageOutcome> for DetectedLabels {
    fn from_iter<I: IntoIterator<Item = &'a ImageOutcome>>(iter: I) -> Self {
        let mut labels = DetectedLabels::new();
        for outcome in iter {
            labels.extend(outcome.detections());
        }
        labels
    }
}

/// Aggregate view of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub detected: usize,
    pub without_objects: Vec<String>,
    pub with_errors: Vec<String>,
    pub result_lines: Vec<String>,
    pub expected: Vec<String>,
    pub found: DetectedLabels,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ImageOutcome], expected: &[&str]) -> Self {
        let found: DetectedLabels = outcomes.iter().collect();

        let names_where = |pred: fn(&ImageStatus) -> bool| {
            outcomes
                .iter()
                .filter(|o| pred(&o.status))
                .map(|o| o.filename.clone())
                .sorted()
                .collect::<Vec<_>>()
        };

        Self {
            total: outcomes.len(),
            detected: outcomes
                .iter()
                .filter(|o| matches!(o.status, ImageStatus::Detected(_)))
                .count(),
            without_objects: names_where(|s| matches!(s, ImageStatus::Empty)),
            with_errors: names_where(|s| matches!(s, ImageStatus::Errored(_))),
            result_lines: outcomes.iter().map(ImageOutcome::result_line).collect(),
            expected: expected.iter().map(|e| e.to_string()).collect(),
            missing: found.missing_from(expected),
            unexpected: found.unexpected_against(expected),
            found,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "PROCESSING SUMMARY")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Total images processed: {}", self.total)?;
        writeln!(f, "Images with objects detected: {}", self.detected)?;
        writeln!(f, "Images with no objects detected: {}", self.without_objects.len())?;
        writeln!(f, "Images with errors: {}", self.with_errors.len())?;
        writeln!(f)?;

        for (title, names) in [
            ("Images with no objects detected:", &self.without_objects),
            ("Images with errors:", &self.with_errors),
        ] {
            if names.is_empty() {
                continue;
            }
            writeln!(f, "{title}")?;
            for name in names {
                writeln!(f, "  - {name}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Detailed Results:")?;
        for line in &self.result_lines {
            writeln!(f, "  {line}")?;
        }
        writeln!(f)?;

        writeln!(f, "Expected objects list:")?;
        writeln!(f, "  {}", self.expected.join(", "))?;
        writeln!(f)?;

        if self.found.is_empty() {
            writeln!(f, "No objects were detected in any image.")?;
            writeln!(f, "Missing objects: {}", self.missing.join(", "))?;
        } else {
            writeln!(f, "Objects actually found: {}", self.found.iter().join(", "))?;

            if self.missing.is_empty() {
                writeln!(f, "All expected objects were found!")?;
            } else {
                writeln!(f, "Missing objects: {}", self.missing.join(", "))?;
            }

            if self.unexpected.is_empty() {
                writeln!(f, "No unexpected objects were found.")?;
            } else {
                writeln!(f, "Unexpected objects found: {}", self.unexpected.join(", "))?;
            }
        }
        writeln!(f)?;

        if !self.without_objects.is_empty() {
            writeln!(
                f,
                "Images with no objects detected: {}",
                self.without_objects.join(", ")
            )?;
            writeln!(f)?;
        }

        Ok(())
    }
}
