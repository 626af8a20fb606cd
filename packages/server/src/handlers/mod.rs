pub mod avatar;
pub mod info;
