mod app;
mod capabilities;
mod effects;
mod logging;
mod ui;

pub use app::run_app;
