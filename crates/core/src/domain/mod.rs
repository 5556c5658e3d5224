pub mod deviation;
pub mod document;
pub mod line_item;
pub mod meta;
pub mod summary;
