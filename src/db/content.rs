use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const CONTENT_DIR: &str = "content";

/// Stand-alone markdown pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticPage {
    About,
    Privacy,
}

impl StaticPage {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::About => "about.md",
            Self::Privacy => "privacy.md",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::About => "关于我们",
            Self::Privacy => "隐私政策",
        }
    }

    /// Markdown served when the page has never been written.
    #[must_use]
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::About => "",
            Self::Privacy => {
                "# 隐私政策\n\n本站非常重视您的隐私。目前本站仅记录基本的浏览器指纹用于卡密验证，不收集任何个人敏感信息。"
            }
        }
    }
}

/// Markdown bodies: one file per article plus the static pages.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn article_path(&self, article_id: &str) -> std::io::Result<PathBuf> {
        if !is_safe_id(article_id) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid article id: {article_id:?}"),
            ));
        }
        Ok(self
            .root
            .join(CONTENT_DIR)
            .join(format!("{article_id}.md")))
    }

    fn page_path(&self, page: StaticPage) -> PathBuf {
        self.root.join(page.file_name())
    }

    pub async fn read_article(&self, article_id: &str) -> std::io::Result<String> {
        let path = self.article_path(article_id)?;
        read_text(&path).await
    }

    pub async fn write_article(&self, article_id: &str, markdown: &str) -> std::io::Result<()> {
        let path = self.article_path(article_id)?;
        write_text(&path, markdown).await
    }

    /// Removes an article body. A body that is already gone is not an error.
    pub async fn delete_article(&self, article_id: &str) -> std::io::Result<()> {
        let path = self.article_path(article_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(article_id, "Content file already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reads a static page, returning `None` when it was never written.
    pub async fn read_page(&self, page: StaticPage) -> std::io::Result<Option<String>> {
        match read_text(&self.page_path(page)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn write_page(&self, page: StaticPage, markdown: &str) -> std::io::Result<()> {
        write_text(&self.page_path(page), markdown).await
    }
}

/// Article ids become file names, so only a conservative character set is allowed.
#[must_use]
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn read_text(path: &Path) -> std::io::Result<String> {
    let text = fs::read_to_string(path).await?;
    match text.strip_prefix('\u{feff}') {
        Some(body) => Ok(body.to_string()),
        None => Ok(text),
    }
}

async fn write_text(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_content() -> ContentStore {
        ContentStore::new(
            std::env::temp_dir().join(format!("keymark-content-{}", uuid::Uuid::new_v4())),
        )
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(is_safe_id("post-20250301-120000-ab12"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../settings"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a.md"));
    }

    #[tokio::test]
    async fn article_body_round_trip_and_delete() {
        let content = temp_content();
        content.write_article("post-1", "# Title").await.unwrap();
        assert_eq!(content.read_article("post-1").await.unwrap(), "# Title");

        content.delete_article("post-1").await.unwrap();
        assert!(content.read_article("post-1").await.is_err());
        content.delete_article("post-1").await.unwrap();
    }

    #[tokio::test]
    async fn unwritten_page_reads_none() {
        let content = temp_content();
        assert!(content.read_page(StaticPage::About).await.unwrap().is_none());

        content.write_page(StaticPage::About, "hello").await.unwrap();
        assert_eq!(
            content.read_page(StaticPage::About).await.unwrap().as_deref(),
            Some("hello")
        );
    }
}
