pub mod combine;
pub mod json;
