pub mod observation;
pub mod summary;
