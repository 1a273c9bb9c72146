pub mod completion;
pub mod manual_order;
pub mod merge;
pub mod models;
pub mod visibility;
pub mod window;
