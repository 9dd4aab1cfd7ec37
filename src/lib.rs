// Library entry point for the AST dump tool.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
