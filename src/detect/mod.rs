mod backend;
pub mod backends;
pub mod categories;
pub mod labels;
mod registry;
mod result;
pub mod yolo;

pub use backend::DetectionModel;
pub use backends::{load_model, StubModel};
pub use categories::{detect_categories, DEFAULT_CONFIDENCE_THRESHOLD};
pub use labels::{ClassNames, UNKNOWN_LABEL};
pub use registry::ModelRegistry;
pub use result::{BoundingBox, BoxPrediction, Detection};
