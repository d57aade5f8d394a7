pub mod category;
pub mod page;
pub mod profile;
pub mod user;
