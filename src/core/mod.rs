pub mod config;
pub mod driver;

pub use config::{BrowserConfig, Config, WaitConfig};
pub use driver::{Driver, DriverFactory};
