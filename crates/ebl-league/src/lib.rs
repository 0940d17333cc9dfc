// League logic: weekly category scoring and roster move resolution.

pub mod moves;
pub mod scoring;
