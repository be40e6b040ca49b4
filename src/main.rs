use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tracing::info;

use pagecraft::errors::Result;
use pagecraft::session::BrowserSession;
use pagecraft::{Config, Locator, Page, PageObject, SessionRegistry};

#[derive(Parser)]
#[command(name = "pagecraft", about = "Drive a sample page object against headless Chrome")]
struct Args {
    /// URL the demo page navigates to
    #[arg(long, default_value = "https://example.com")]
    url: String,

    /// Anchor CSS selector that marks the page as loaded
    #[arg(long, default_value = "h1")]
    anchor: String,

    /// Text to check for once the page is up
    #[arg(long, default_value = "Example")]
    expect_text: String,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,
}

struct DemoPage {
    url: String,
    anchor: Locator,
}

#[async_trait]
impl Page for DemoPage {
    fn name(&self) -> &str {
        "demo-page"
    }

    fn module(&self) -> &str {
        "demo"
    }

    fn locator(&self) -> &Locator {
        &self.anchor
    }

    async fn invoke_actions(&self, session: &BrowserSession) -> Result<()> {
        session.open(&self.url).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let mut config = Config::load()?;
    if args.headed {
        config.browser.headless = false;
    }

    let registry = SessionRegistry::chrome(config);
    let page = PageObject::new(
        &registry,
        DemoPage {
            url: args.url,
            anchor: Locator::css(&args.anchor),
        },
    );

    page.invoke().await?;
    info!("page is up");

    if page.text_exists(&args.expect_text, Duration::from_secs(2)).await? {
        info!(text = %args.expect_text, "expected text is visible");
    } else {
        info!(text = %args.expect_text, "expected text was not found");
    }

    for (module, text) in registry.collect_logs().await? {
        if !text.is_empty() {
            info!(module = %module, "browser logs:\n{}", text);
        }
    }

    registry.close_all().await?;
    Ok(())
}
