//! Chrome-backed fetch worker
//!
//! Each worker owns one browser process, its CDP handler task and its
//! profile directory. A page is opened per fetch and closed afterwards, so
//! the session stays warm while page state never leaks between URLs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chromiumoxide::browser::Browser;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::browser_profile::{BrowserProfile, create_worker_profile};
use crate::browser_setup::{apply_stealth_measures, launch_browser, resolve_browser_executable};
use crate::content::ContentPipeline;
use crate::worker_pool::{FetchError, Worker, WorkerFactory};

/// CDP errors that mean the browser connection itself is gone
fn classify_cdp_error(context: &str, err: CdpError) -> FetchError {
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            FetchError::SessionLost(format!("{context}: {err}"))
        }
        other => FetchError::Navigation(format!("{context}: {other}")),
    }
}

/// Closes the page when the fetch ends, including when the fetch future is
/// dropped by an outer timeout
struct PageGuard {
    page: Option<Page>,
}

impl PageGuard {
    fn page(&self) -> Result<&Page, FetchError> {
        self.page
            .as_ref()
            .ok_or_else(|| FetchError::Extraction("page already closed".into()))
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            trace!("Failed to close page: {}", e);
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

/// One Chrome session
pub struct BrowserWorker {
    id: u64,
    browser: Browser,
    handler: JoinHandle<()>,
    profile: BrowserProfile,
    pipeline: ContentPipeline,
}

impl BrowserWorker {
    async fn load_html(&self, page: &Page, url: &str, timeout: Duration) -> Result<String, FetchError> {
        if let Err(e) = apply_stealth_measures(page).await {
            warn!(worker = self.id, "Stealth injection failed: {}", e);
        }

        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| classify_cdp_error("navigation", e))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| classify_cdp_error("page load", e))?;
            Ok::<_, FetchError>(())
        };
        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        page.content()
            .await
            .map_err(|e| classify_cdp_error("content", e))
    }
}

impl Worker for BrowserWorker {
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        _instruction: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            if self.handler.is_finished() {
                return Err(FetchError::SessionLost(
                    "browser handler task has exited".into(),
                ));
            }

            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| classify_cdp_error("new page", e))?;
            let guard = PageGuard { page: Some(page) };

            let loaded = match guard.page() {
                Ok(page) => self.load_html(page, url, timeout).await,
                Err(e) => Err(e),
            };
            guard.close().await;
            let html = loaded?;
            debug!(worker = self.id, url, bytes = html.len(), "Page rendered");

            let pipeline = self.pipeline;
            let text = tokio::task::spawn_blocking(move || pipeline.process_html(&html))
                .await
                .map_err(|e| FetchError::Extraction(format!("extraction task failed: {e}")))??;

            if text.trim().is_empty() {
                return Err(FetchError::EmptyContent);
            }
            Ok(text)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let Self {
                id,
                mut browser,
                handler,
                profile,
                ..
            } = *self;

            if let Err(e) = browser.close().await {
                debug!(worker = id, "Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!(worker = id, "Browser wait failed: {}", e);
            }
            handler.abort();
            // Chrome has exited; its profile lock is released
            drop(profile);
            info!(worker = id, "Browser worker closed");
        })
    }
}

/// Launches [`BrowserWorker`]s from one resolved Chrome executable
pub struct BrowserWorkerFactory {
    executable: PathBuf,
    headless: bool,
    pipeline: ContentPipeline,
}

impl BrowserWorkerFactory {
    pub async fn new(headless: bool, pipeline: ContentPipeline) -> Result<Self> {
        let executable = resolve_browser_executable().await?;
        info!("Browser workers will use {}", executable.display());
        Ok(Self {
            executable,
            headless,
            pipeline,
        })
    }
}

impl WorkerFactory for BrowserWorkerFactory {
    fn create(&self, id: u64) -> BoxFuture<'_, Result<Box<dyn Worker>>> {
        Box::pin(async move {
            let profile = create_worker_profile(id)?;
            let (browser, handler) =
                launch_browser(&self.executable, self.headless, profile.path()).await?;
            debug!(worker = id, profile = %profile.path().display(), "Browser worker launched");
            Ok(Box::new(BrowserWorker {
                id,
                browser,
                handler,
                profile,
                pipeline: self.pipeline,
            }) as Box<dyn Worker>)
        })
    }

    fn kind(&self) -> &'static str {
        "browser"
    }
}
