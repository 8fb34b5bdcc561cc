mod app;
mod render;
mod run;
mod types;

pub use run::run;
