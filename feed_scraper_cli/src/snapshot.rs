use crate::error::{ItemError, ScrapeError};
use crate::scraper::FeedPage;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Offline stand-in for a live feed: a list of saved HTML documents where
/// each scroll reveals the next one. Scrolling past the end stays on the
/// last document.
pub struct SnapshotPage {
    frames: Vec<String>,
    current: Mutex<usize>,
}

impl SnapshotPage {
    pub fn new(frames: Vec<String>) -> Self {
        Self {
            frames,
            current: Mutex::new(0),
        }
    }

    /// Loads every `.html`/`.htm` file in `dir`, ordered by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, ScrapeError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_html = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
                .unwrap_or(false);
            if is_html {
                paths.push(path);
            }
        }
        paths.sort();

        let frames = paths
            .iter()
            .map(std::fs::read_to_string)
            .collect::<Result<Vec<_>, _>>()?;
        info!("loaded {} snapshot frames from {:?}", frames.len(), dir);
        Ok(Self::new(frames))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn current(&self) -> usize {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Text of every node matching `selector` in `html`, whitespace-trimmed.
pub fn select_texts(html: &str, selector: &str) -> Result<Vec<String>, ScrapeError> {
    let selector =
        Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector(selector.to_string()))?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect())
}

#[async_trait]
impl FeedPage for SnapshotPage {
    async fn read_items(
        &self,
        selector: &str,
    ) -> Result<Vec<Result<String, ItemError>>, ScrapeError> {
        let Some(frame) = self.frames.get(self.current()) else {
            return Ok(Vec::new());
        };
        Ok(select_texts(frame, selector)?.into_iter().map(Ok).collect())
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<(), ScrapeError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if *current + 1 < self.frames.len() {
            *current += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = r#"
        <html><body>
          <article><div lang="en">First post in the snapshot feed</div></article>
          <article><div lang="en">  Second post, padded with spaces  </div></article>
          <div lang="en">Not inside an article</div>
        </body></html>
    "#;

    #[test]
    fn selects_text_inside_articles_only() {
        let texts = select_texts(FRAME, "article div[lang]").unwrap();
        assert_eq!(
            texts,
            vec![
                "First post in the snapshot feed",
                "Second post, padded with spaces"
            ]
        );
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = select_texts(FRAME, "article[[").unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn scrolling_advances_and_clamps() {
        let page = SnapshotPage::new(vec![
            "<article>one</article>".into(),
            "<article>two</article>".into(),
        ]);
        assert_eq!(page.read_items("article").await.unwrap(), vec![Ok::<_, ItemError>("one".to_string())]);
        page.scroll_by(1000).await.unwrap();
        page.scroll_by(1000).await.unwrap();
        assert_eq!(page.read_items("article").await.unwrap(), vec![Ok::<_, ItemError>("two".to_string())]);
    }

    #[test]
    fn from_dir_orders_frames_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02.html"), "<article>later</article>").unwrap();
        std::fs::write(dir.path().join("01.html"), "<article>earlier</article>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let page = SnapshotPage::from_dir(dir.path()).unwrap();
        assert_eq!(page.frame_count(), 2);
        assert_eq!(page.frames[0], "<article>earlier</article>");
    }
}
