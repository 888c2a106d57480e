mod report;
mod score;

pub use report::{node_prefix, PictureReport, ReportPackage, REPORT_TYPE_TAG};
pub use score::Score;

pub(crate) use report::picture_name;
