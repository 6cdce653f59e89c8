//! Interactive search-run driver.
//!
//! Prompts for per-profile search counts, launches the browser with remote
//! debugging enabled, attaches over CDP and runs the searches. The
//! "Default" profile's browser is closed afterwards; "Profile 1" is left
//! open, detached.
//!
//! Environment overrides:
//! - `AUTOSEARCH_BROWSER`: browser executable path
//! - `AUTOSEARCH_USER_DATA_DIR`: user data directory holding the profiles
//! - `AUTOSEARCH_QUERIES`: query file (default `query.txt`)

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use autosearch::{queries, Orchestrator, RunEvent, RunTarget, SearchConfig};
use browser::{endpoint, Browser, BrowserLauncher, EmulationProfile};

const CDP_HOST: &str = "127.0.0.1";
const CDP_PORT: u16 = 9222;
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(20);

fn browser_executable() -> PathBuf {
    std::env::var_os("AUTOSEARCH_BROWSER")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("msedge"))
}

fn user_data_dir() -> PathBuf {
    std::env::var_os("AUTOSEARCH_USER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("edge-user-data"))
}

fn queries_file() -> PathBuf {
    std::env::var_os("AUTOSEARCH_QUERIES")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("query.txt"))
}

/// Prompt until the user types a non-negative integer.
fn ask_count(prompt: &str) -> usize {
    let stdin = std::io::stdin();
    loop {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.read_line(&mut line).is_err() {
            return 0;
        }
        match line.trim().parse::<usize>() {
            Ok(n) => return n,
            Err(_) => println!("Enter a whole number (e.g. 10)."),
        }
    }
}

/// Print one console line per run event. The task ends once the event bus
/// is dropped and the backlog is drained; join the handle to guarantee the
/// last lines make it out before exiting.
fn spawn_console_sink(orchestrator: &Orchestrator) -> tokio::task::JoinHandle<()> {
    let mut rx = orchestrator.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                RunEvent::AttemptFinished {
                    label,
                    index,
                    total,
                    query,
                    outcome,
                } => println!("[{label} {index}/{total}] {query} ({outcome})"),
                RunEvent::TargetSkipped { label } => println!("[{label}] no searches requested."),
                RunEvent::Warning { label, message } => println!("[WARN {label}] {message}"),
            }
        }
    })
}

/// Launch the profile's browser, run its targets, then either terminate the
/// process or leave it open. On error the process is still terminated when
/// it was ours to close.
async fn run_profile(
    profile_directory: &str,
    corpus: &[String],
    plan: Vec<RunTarget>,
    leave_open: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if plan.iter().all(|t| t.count == 0) {
        println!("[{profile_directory}] skipped.");
        return Ok(());
    }

    let config = SearchConfig::default();
    let launcher = BrowserLauncher::new(browser_executable(), user_data_dir())
        .profile(profile_directory)
        .endpoint(CDP_HOST, CDP_PORT)
        .start_url(&config.home_url);
    let launched = launcher.spawn()?;

    let result = drive(&config, corpus, &plan).await;

    if leave_open {
        launched.leave_open();
    } else {
        launched.terminate().await;
    }
    result
}

async fn drive(
    config: &SearchConfig,
    corpus: &[String],
    plan: &[RunTarget],
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = endpoint::resolve(CDP_HOST, CDP_PORT, ENDPOINT_TIMEOUT).await?;
    let browser = Browser::connect(&resolved.ws_url).await?;

    let orchestrator = Orchestrator::new(config.clone());
    let sink = spawn_console_sink(&orchestrator);

    let result = orchestrator.run_plan(&browser, corpus, plan).await;

    // Detach regardless; the process-level decision is the caller's.
    if let Err(e) = browser.close().await {
        tracing::debug!("detach failed: {e}");
    }

    // Dropping the orchestrator closes the event bus; the sink drains its
    // backlog and exits, so nothing published above goes unprinted.
    drop(orchestrator);
    let _ = sink.await;

    result.map_err(Into::into)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let default_n = ask_count("How many searches on the DEFAULT profile? (0 to skip): ");
    let mobile_n = ask_count("How many mobile-emulated searches on DEFAULT? (0 to skip): ");
    let profile1_n = ask_count("How many searches on PROFILE 1? (0 to skip): ");

    let corpus = queries::load(&queries_file())?;

    println!("\n=== Profile: Default (closed when done) ===");
    run_profile(
        "Default",
        &corpus,
        vec![
            RunTarget {
                label: "DEFAULT".to_string(),
                count: default_n,
                emulation: None,
            },
            RunTarget {
                label: "DEFAULT-MOBILE".to_string(),
                count: mobile_n,
                emulation: Some(EmulationProfile::phone()),
            },
        ],
        false,
    )
    .await?;

    println!("\n=== Profile: Profile 1 (left open) ===");
    run_profile(
        "Profile 1",
        &corpus,
        vec![RunTarget {
            label: "PROFILE_1".to_string(),
            count: profile1_n,
            emulation: None,
        }],
        true,
    )
    .await?;

    println!("\nDone. (If Profile 1 ran, its browser is still open.)");
    Ok(())
}
