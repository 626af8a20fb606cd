pub mod avatar;
pub mod info;
pub mod shared;
