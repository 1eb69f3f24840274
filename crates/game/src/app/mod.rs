mod board_view;
pub(crate) mod bootstrap;
mod controller;
mod input;
mod level_file;
pub(crate) mod loop_runner;
mod paths;
