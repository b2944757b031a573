//! Browser helpers for tests that drive a real Chrome

use anyhow::Result;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Path to an axe-core build, required by browser audits
///
/// Browser audits only run when `AXE_SCRIPT` points at `axe.min.js` and
/// `SKIP_BROWSER_TESTS` is unset.
pub fn axe_script() -> Option<PathBuf> {
    if std::env::var("SKIP_BROWSER_TESTS").is_ok() {
        return None;
    }
    std::env::var("AXE_SCRIPT")
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

/// Skip the test unless an axe-core build is available
#[macro_export]
macro_rules! require_axe {
    () => {
        match browser::axe_script() {
            Some(path) => path,
            None => {
                eprintln!("Skipping test: AXE_SCRIPT not set or SKIP_BROWSER_TESTS is set");
                return;
            }
        }
    };
}

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let cache = PathBuf::from(home).join(".cache/puppeteer/chrome");

    let mut versions: Vec<_> = std::fs::read_dir(&cache)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort_by(|a, b| b.cmp(a));

    versions.into_iter().find_map(|dir| {
        [
            "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
            "chrome-linux64/chrome",
        ]
        .iter()
        .map(|rel| dir.join(rel))
        .find(|p| p.exists())
    })
}

/// Launch a headless browser with its own profile directory
pub async fn create_test_browser() -> Result<(Browser, tokio::task::JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder();

    if let Some(chrome_path) = find_chrome_for_testing() {
        eprintln!("Using Chrome for Testing: {}", chrome_path.display());
        builder = builder.chrome_executable(chrome_path);
    }

    static BROWSER_ID: AtomicU64 = AtomicU64::new(0);
    let profile = std::env::temp_dir().join(format!(
        "a11y-audit-{}-{}",
        std::process::id(),
        BROWSER_ID.fetch_add(1, Ordering::SeqCst)
    ));
    if profile.exists() {
        let _ = std::fs::remove_dir_all(&profile);
    }
    builder = builder.user_data_dir(profile);

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

    let (browser, mut handler) = Browser::launch(config).await?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                eprintln!("Browser handler error: {:?}", e);
                break;
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;

    Ok((browser, handle))
}

/// Try to create a browser, returning `None` when Chrome is not installed
pub async fn require_browser() -> Option<(Browser, tokio::task::JoinHandle<()>)> {
    match create_test_browser().await {
        Ok(browser) => Some(browser),
        Err(e) => {
            eprintln!("Skipping: browser unavailable ({})", e);
            None
        }
    }
}
