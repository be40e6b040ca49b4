pub mod chrome;
pub mod mock;

pub use chrome::{ChromeDriver, ChromeDriverFactory};
pub use mock::{MockDriver, MockDriverFactory, MockState};
