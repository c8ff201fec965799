pub mod app;
pub mod draw;
