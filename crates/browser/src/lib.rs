//! Attach-mode browser driving over the Chrome DevTools Protocol.
//!
//! This crate connects to an already-running Chromium-family browser
//! through its remote debugging endpoint and drives one tab at a time:
//! resolve the endpoint, attach a session, acquire a page, then navigate,
//! click, type and scroll through real input events. Device emulation is
//! toggled on the live session so cookies and login state carry over.
//!
//! Strictly single-flow: one task, one page, sequential operations. All
//! waits are bounded and cooperative.

pub mod cdp;
pub mod emulation;
pub mod endpoint;
pub mod error;
pub mod launcher;
pub mod page;
pub mod session;

pub use cdp::{CdpClient, CdpError, CdpSession};
pub use emulation::EmulationProfile;
pub use endpoint::DebugEndpoint;
pub use error::BrowserError;
pub use launcher::{BrowserLauncher, LaunchedBrowser};
pub use page::{Page, WaitResult};
pub use session::Browser;
