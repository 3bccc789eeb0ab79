pub mod item;
pub mod link;
pub mod list;
pub mod share;
