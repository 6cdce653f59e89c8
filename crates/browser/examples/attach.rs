//! Attach to a running browser and drive its first tab.
//!
//! Start the browser with `--remote-debugging-port=9222` first.

use std::time::Duration;

use browser::{endpoint, Browser};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let resolved = endpoint::resolve("127.0.0.1", 9222, Duration::from_secs(15)).await?;
    println!("debug endpoint: {}", resolved.ws_url);

    let browser = Browser::connect(&resolved.ws_url).await?;
    let page = browser.attach_page().await?;

    page.goto("https://www.rust-lang.org", Duration::from_secs(20))
        .await?;
    println!("now at: {}", page.url().await?);

    let title = page.evaluate("document.title").await?;
    println!("title: {title}");

    browser.close().await?;
    Ok(())
}
