mod app;
mod bindings;
mod config;
mod dom;
mod drag;
mod geometry;
mod overlay;
mod pad;
mod pages;
mod pdf;
mod state;

pub use app::run;
