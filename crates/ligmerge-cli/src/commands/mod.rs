pub mod fix;
pub mod merge;
pub mod pose;
pub mod run;
