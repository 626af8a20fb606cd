pub mod avatar;
pub mod student;
