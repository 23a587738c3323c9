//! Plain-text document extraction
//!
//! Resolves a document reference to its text and serves character slices
//! of it. References are `http://`/`https://` URLs, `file://` URLs or
//! filesystem paths. HTML bodies are reduced to their visible text.
//!
//! Local reads can be confined to a set of allowed roots; a path that
//! resolves outside all of them is rejected before it is opened.

use async_trait::async_trait;
use conductor_application::ports::file_extractor::{ExtractionError, FileExtractorPort};
use conductor_domain::ExtractedPage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maximum document body accepted over HTTP (10 MB)
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub struct TextExtractor {
    client: reqwest::Client,
    /// Most recently loaded document, reused across consecutive page reads
    last: Mutex<Option<(String, Arc<String>)>>,
    /// Canonical directories or files local reads must stay under; `None` means unrestricted
    allowed_roots: Option<Vec<PathBuf>>,
}

impl TextExtractor {
    pub fn new(timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::ReadFailed {
                reference: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            last: Mutex::new(None),
            allowed_roots: None,
        })
    }

    /// Confine local reads to `roots`. Roots that cannot be resolved are
    /// skipped, so an empty result denies every local path.
    pub fn with_allowed_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let roots = roots
            .into_iter()
            .filter_map(|root| match std::fs::canonicalize(&root) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Ignoring unresolvable document root");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(roots = ?roots, "Local document reads confined");
        self.allowed_roots = Some(roots);
        self
    }

    async fn load(&self, reference: &str) -> Result<Arc<String>, ExtractionError> {
        if let Some((cached_ref, text)) = self.last.lock().await.as_ref()
            && cached_ref == reference
        {
            return Ok(Arc::clone(text));
        }

        let text = Arc::new(if is_http(reference) {
            self.fetch(reference).await?
        } else {
            read_file(reference, self.allowed_roots.as_deref()).await?
        });
        debug!(document = reference, chars = text.chars().count(), "Loaded document");

        *self.last.lock().await = Some((reference.to_string(), Arc::clone(&text)));
        Ok(text)
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractionError> {
        let read_failed = |message: String| ExtractionError::ReadFailed {
            reference: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| read_failed(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ExtractionError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(read_failed(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if is_binary(&content_type) {
            return Err(ExtractionError::Unsupported(format!("{} ({})", url, content_type)));
        }
        let is_html = content_type.contains("html");

        let bytes = response.bytes().await.map_err(|e| read_failed(e.to_string()))?;
        if bytes.len() > MAX_BODY_SIZE {
            return Err(read_failed(format!(
                "Body exceeds {} bytes",
                MAX_BODY_SIZE
            )));
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(if is_html { html_to_text(&body) } else { body })
    }
}

#[async_trait]
impl FileExtractorPort for TextExtractor {
    async fn extract(
        &self,
        document_ref: &str,
        cursor: usize,
        page_size: usize,
    ) -> Result<ExtractedPage, ExtractionError> {
        let text = self.load(document_ref).await?;
        Ok(ExtractedPage::from_text(&text, cursor, page_size))
    }
}

fn is_http(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

fn is_binary(content_type: &str) -> bool {
    content_type.starts_with("image/")
        || content_type.starts_with("audio/")
        || content_type.starts_with("video/")
        || content_type.starts_with("application/pdf")
        || content_type.starts_with("application/octet-stream")
}

fn io_error(reference: &str, e: std::io::Error) -> ExtractionError {
    match e.kind() {
        ErrorKind::NotFound => ExtractionError::NotFound(reference.to_string()),
        _ => ExtractionError::ReadFailed {
            reference: reference.to_string(),
            message: e.to_string(),
        },
    }
}

async fn read_file(
    reference: &str,
    allowed_roots: Option<&[PathBuf]>,
) -> Result<String, ExtractionError> {
    let path = reference.strip_prefix("file://").unwrap_or(reference);
    if Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    {
        return Err(ExtractionError::Unsupported(reference.to_string()));
    }

    if let Some(roots) = allowed_roots {
        let resolved = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| io_error(reference, e))?;
        if !roots.iter().any(|root| resolved.starts_with(root)) {
            warn!(document = reference, "Rejected read outside the allowed roots");
            return Err(ExtractionError::Unsupported(format!(
                "{} (outside the allowed directories)",
                reference
            )));
        }
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(reference, e))?;
    let text = String::from_utf8(bytes).map_err(|_| ExtractionError::ReadFailed {
        reference: reference.to_string(),
        message: "not valid UTF-8 text".to_string(),
    })?;

    let is_html = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    Ok(if is_html { html_to_text(&text) } else { text })
}

/// Subtrees that never contribute visible text
const SKIP_TAGS: [&str; 5] = ["script", "style", "noscript", "svg", "template"];

/// Elements that start a new line of text
const BLOCK_TAGS: [&str; 20] = [
    "p", "br", "div", "li", "ul", "ol", "tr", "table", "section", "article", "header", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote",
];

/// Reduce an HTML document to its visible text, one block per line.
fn html_to_text(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::with_capacity(html.len() / 2);
    collect_element_text(root, &mut raw);
    clean_whitespace(&raw)
}

fn collect_element_text(element: scraper::ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source line breaks are layout, not content.
            scraper::Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            scraper::Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = scraper::ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_element_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse whitespace inside lines and keep at most one blank line in a row.
fn clean_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}
