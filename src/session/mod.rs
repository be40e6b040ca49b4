pub mod browser;
pub mod registry;

pub use browser::BrowserSession;
pub use registry::{ActiveContext, SessionRegistry};
