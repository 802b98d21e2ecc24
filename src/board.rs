//! Shared page state plus publishing to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

use crate::page::Page;

/// Writes the page as an HTML document, atomically replacing the previous one.
#[derive(Debug, Clone)]
pub struct HtmlFileSink {
    path: PathBuf,
}

impl HtmlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn publish(&self, page: &Page) -> Result<()> {
        let html = page.to_html();
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, html).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "dashboard.html".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// The page both loops write to. Every mutation is followed by a publish
/// while the lock is still held, so the file never shows a half-updated page.
pub struct Board {
    page: Mutex<Page>,
    sink: Option<HtmlFileSink>,
}

impl Board {
    pub fn new(page: Page, sink: Option<HtmlFileSink>) -> Self {
        Self {
            page: Mutex::new(page),
            sink,
        }
    }

    /// In-memory only; nothing is written.
    pub fn detached(page: Page) -> Self {
        Self::new(page, None)
    }

    /// Mutate the page, then publish it. The file write runs synchronously on
    /// the caller's thread with the lock held, so async callers block for one
    /// small write per call. On a publish error the in-memory page keeps the
    /// change and the next successful publish writes it out.
    pub fn update<R>(&self, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        let mut page = self
            .page
            .lock()
            .map_err(|_| anyhow!("page lock poisoned"))?;
        let out = f(&mut page);
        if let Some(sink) = &self.sink {
            sink.publish(&page)?;
        }
        Ok(out)
    }

    /// Read-only access without publishing.
    pub fn with_page<R>(&self, f: impl FnOnce(&Page) -> R) -> Result<R> {
        let page = self
            .page
            .lock()
            .map_err(|_| anyhow!("page lock poisoned"))?;
        Ok(f(&page))
    }
}
