pub mod controller;
pub mod models;
pub mod permissions;
pub mod radio;
pub mod session;
pub mod settings;
