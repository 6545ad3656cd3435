pub mod conversation;
pub mod formatter;
pub mod guide;
pub mod image;
pub mod labels;
pub mod metrics;
pub mod providers;

pub use formatter::ResponseFormatter;
pub use guide::{GuideError, GuideSettings, PlantGuide};
pub use image::ImagePolicy;
