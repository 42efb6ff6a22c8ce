//! Class index -> label tables.
//!
//! Model label tables are not guaranteed to be dense, so lookups go through an
//! explicit map with an `"unknown"` default.

use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Label reported for class indices missing from a model's table.
pub const UNKNOWN_LABEL: &str = "unknown";

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: HashMap<usize, String>,
}

impl ClassNames {
    /// Dense table: label `i` is class `i`.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: labels
                .into_iter()
                .enumerate()
                .map(|(i, l)| (i, l.into()))
                .collect(),
        }
    }

    /// Sparse table from explicit (index, label) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(i, l)| (i, l.into())).collect(),
        }
    }

    /// The 80-class COCO table used by general-purpose YOLO checkpoints.
    pub fn coco() -> Self {
        Self::from_labels(COCO_CLASSES)
    }

    /// Load a names file.
    ///
    /// Accepted formats: a JSON object (`{"0": "knife"}`), a JSON array, or
    /// one label per line (blank lines ignored).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class names {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid class names {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') {
            let map: BTreeMap<String, String> = serde_json::from_str(trimmed)?;
            let pairs = map
                .into_iter()
                .map(|(k, v)| {
                    k.trim()
                        .parse::<usize>()
                        .map(|idx| (idx, v))
                        .map_err(|_| anyhow!("class index '{}' is not an integer", k))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Self::from_pairs(pairs))
        } else if trimmed.starts_with('[') {
            let labels: Vec<String> = serde_json::from_str(trimmed)?;
            Ok(Self::from_labels(labels))
        } else {
            Ok(Self::from_labels(
                raw.lines().map(str::trim).filter(|l| !l.is_empty()),
            ))
        }
    }

    /// Parse the `names` metadata entry of an Ultralytics ONNX export.
    ///
    /// The exporter stores the Python dict repr, e.g.
    /// `{0: 'knife', 1: "brass knuckles"}`. JSON objects are accepted too.
    pub fn from_model_metadata(raw: &str) -> Result<Self> {
        let body = raw
            .trim()
            .strip_prefix('{')
            .and_then(|b| b.strip_suffix('}'))
            .ok_or_else(|| anyhow!("names metadata is not a mapping"))?;

        let mut pairs = Vec::new();
        let mut rest = body.trim_start();
        while !rest.is_empty() {
            let (index, value) = rest
                .split_once(':')
                .ok_or_else(|| anyhow!("names entry '{}' has no ':'", rest))?;
            let index = index.trim().trim_matches(['\'', '"']);
            let index: usize = index
                .parse()
                .map_err(|_| anyhow!("class index '{}' is not an integer", index))?;

            let value = value.trim_start();
            let quote = value
                .chars()
                .next()
                .filter(|c| *c == '\'' || *c == '"')
                .ok_or_else(|| anyhow!("label for class {} is not quoted", index))?;
            let value = &value[1..];
            let end = value
                .find(quote)
                .ok_or_else(|| anyhow!("label for class {} is unterminated", index))?;
            pairs.push((index, value[..end].to_string()));

            rest = value[end + 1..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
        }

        if pairs.is_empty() {
            return Err(anyhow!("names metadata is empty"));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Label for a class index, falling back to [`UNKNOWN_LABEL`].
    pub fn name_for(&self, class_id: usize) -> &str {
        self.names
            .get(&class_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
