pub mod ajax;
pub mod api;
pub mod auth;
pub mod category;
pub mod index;
pub mod page;
pub mod profile;
pub mod session;
