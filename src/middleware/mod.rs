pub mod auth;
pub mod paging;
pub mod tenant;
