use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PromptError;
use crate::model::ArticleRecord;

const HISTORY_PLACEHOLDER: &str = "{history_posts}";
const THEME_PLACEHOLDER: &str = "{my_thema}";

const POSTS_HEADER: &str = "*** Past posts begin ***";
const POSTS_FOOTER: &str = "*** Past posts end ***";

/// Render records as a delimited text block, one labeled section per article.
pub fn format_posts(records: &[ArticleRecord]) -> String {
    let mut parts = Vec::with_capacity(records.len() + 2);
    parts.push(POSTS_HEADER.to_string());
    for r in records {
        let published = r
            .published_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%:z").to_string())
            .unwrap_or_default();
        parts.push(
            [
                "=".repeat(10),
                format!("Title: {}", r.title),
                format!("Published: {}", published),
                format!("URL: {}", r.url),
                format!("Content: {}", r.content),
            ]
            .join("\n"),
        );
    }
    parts.push(POSTS_FOOTER.to_string());
    parts.join("\n\n")
}

/// Assembles the final prompt from `prefix.txt`, `body.txt` and `thema.txt`.
///
/// `body.txt` is required; the other two are optional.
pub struct PromptBuilder {
    dir: PathBuf,
}

impl PromptBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PromptBuilder { dir: dir.into() }
    }

    pub fn build(&self, history_posts: &str) -> Result<String, PromptError> {
        let prefix = self.load_optional("prefix.txt");
        let body = self.load_body()?;
        let theme = self.load_optional("thema.txt");

        let combined = prefix + &body;
        Ok(combined
            .replace(HISTORY_PLACEHOLDER, history_posts)
            .replace(THEME_PLACEHOLDER, &theme))
    }

    fn load_body(&self) -> Result<String, PromptError> {
        let path = self.dir.join("body.txt");
        let text = read(&path)?.ok_or_else(|| PromptError::MissingTemplate { path: path.clone() })?;
        if text.is_empty() {
            return Err(PromptError::EmptyTemplate { path });
        }
        Ok(text)
    }

    fn load_optional(&self, name: &str) -> String {
        let path = self.dir.join(name);
        match read(&path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("{} not found, using empty text", path.display());
                String::new()
            }
            Err(e) => {
                warn!("{}", e);
                String::new()
            }
        }
    }
}

fn read(path: &Path) -> Result<Option<String>, PromptError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PromptError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn record(title: &str, content: &str) -> ArticleRecord {
        ArticleRecord {
            published_at: Some(DateTime::parse_from_rfc3339("2024-01-02T03:04:05+09:00").unwrap()),
            title: title.to_string(),
            url: format!("https://note.test/a/n/{}", title),
            content: content.to_string(),
        }
    }

    #[test]
    fn posts_block_layout() {
        let text = format_posts(&[record("first", "hello"), record("second", "")]);
        let expected = "*** Past posts begin ***\n\n\
            ==========\nTitle: first\nPublished: 2024-01-02 03:04:05+09:00\nURL: https://note.test/a/n/first\nContent: hello\n\n\
            ==========\nTitle: second\nPublished: 2024-01-02 03:04:05+09:00\nURL: https://note.test/a/n/second\nContent: \n\n\
            *** Past posts end ***";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_posts_block() {
        assert_eq!(format_posts(&[]), "*** Past posts begin ***\n\n*** Past posts end ***");
    }

    #[test]
    fn builds_with_all_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefix.txt"), "PREFIX\n").unwrap();
        fs::write(dir.path().join("body.txt"), "Theme: {my_thema}\nHistory:\n{history_posts}").unwrap();
        fs::write(dir.path().join("thema.txt"), "cooking").unwrap();

        let prompt = PromptBuilder::new(dir.path()).build("POSTS").unwrap();
        assert_eq!(prompt, "PREFIX\nTheme: cooking\nHistory:\nPOSTS");
    }

    #[test]
    fn optional_templates_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("body.txt"), "[{my_thema}] {history_posts}").unwrap();

        let prompt = PromptBuilder::new(dir.path()).build("P").unwrap();
        assert_eq!(prompt, "[] P");
    }

    #[test]
    fn missing_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefix.txt"), "x").unwrap();
        assert!(matches!(
            PromptBuilder::new(dir.path()).build("P"),
            Err(PromptError::MissingTemplate { .. })
        ));

        fs::write(dir.path().join("body.txt"), "").unwrap();
        assert!(matches!(
            PromptBuilder::new(dir.path()).build("P"),
            Err(PromptError::EmptyTemplate { .. })
        ));
    }

    #[test]
    fn whitespace_body_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("body.txt"), "  \n").unwrap();
        assert_eq!(PromptBuilder::new(dir.path()).build("P").unwrap(), "  \n");
    }

    #[test]
    fn shipped_templates_have_placeholders() {
        let body = fs::read_to_string("prompts/body.txt").unwrap();
        assert!(body.contains(HISTORY_PLACEHOLDER));
        assert!(body.contains(THEME_PLACEHOLDER));
    }
}
