pub mod component;
pub mod tag;
