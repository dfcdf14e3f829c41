pub mod mul;
pub mod patch;
