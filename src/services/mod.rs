pub mod auth;
pub mod category;
pub mod page;
pub mod profile;
pub mod search;
pub mod visits;
