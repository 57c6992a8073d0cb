pub mod config;
pub mod controller;
pub mod decode;
pub mod error;
pub mod events;
pub mod render;
pub mod source;
pub mod store;
pub mod tasks {
    #[cfg(unix)]
    pub mod control;
    pub mod slideshow;
}
