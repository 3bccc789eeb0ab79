pub use item::ItemController;
pub use link::LinkController;
pub use list::ListController;
pub use share::ShareController;

mod item;
mod link;
mod list;
mod share;
