pub mod libraries;
pub mod login;
pub mod logout;
pub mod sync;
