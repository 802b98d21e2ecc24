pub mod app;
pub mod board;
pub mod clock;
pub mod config;
pub mod feed;
pub mod format;
pub mod logging;
pub mod model;
pub mod page;
pub mod render;
