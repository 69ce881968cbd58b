mod handler;

pub use handler::{generate, health};
