pub mod advisor;
pub mod mastery;
pub mod recommend;
pub mod reference;
