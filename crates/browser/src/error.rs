//! Browser-level error taxonomy.
//!
//! Setup failures (endpoint never ready, attach refused) are fatal to a run;
//! everything transport-level folds into `Cdp`.

use std::time::Duration;

use thiserror::Error;

use crate::cdp::CdpError;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("debug endpoint not ready after {waited:?} (last error: {last_error})")]
    EndpointUnavailable { waited: Duration, last_error: String },

    #[error("failed to attach to browser session: {0}")]
    AttachFailed(#[source] CdpError),

    #[error(transparent)]
    Cdp(#[from] CdpError),

    #[error("browser process error: {0}")]
    Process(#[from] std::io::Error),
}
