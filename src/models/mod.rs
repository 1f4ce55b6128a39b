pub mod assessment;
pub mod candidate;
pub mod certificate;
pub mod recording;
