pub mod analytics;
pub mod registration;
pub mod wizard;
