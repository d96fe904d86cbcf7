pub mod json_loader;

pub use json_loader::{load_departments, parse_departments, save_departments};
