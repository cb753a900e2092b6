//! Article image downloads.
//!
//! Images are named after the article title and written to the image
//! directory only when the server answers with a success status. Any other
//! outcome records [`IMAGE_NOT_AVAILABLE`] and the article is kept.
//!
//! Titles that share their leading characters would map to the same file, so a
//! name already taken in the directory gets a `_2`, `_3`, ... suffix.

use crate::models::IMAGE_NOT_AVAILABLE;
use reqwest::Client;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

const IMAGE_EXTENSION: &str = "jpg";

/// Derive an image filename from the first `max_chars` characters of a title.
///
/// Spaces become underscores and characters that are not allowed in file
/// names are dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(image_filename("India win the toss", 30), "India_win_the_toss.jpg");
/// ```
pub fn image_filename(title: &str, max_chars: usize) -> String {
    let stem: String = title
        .trim()
        .chars()
        .take(max_chars)
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}.{IMAGE_EXTENSION}")
}

/// Downloads article images into one directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    client: Client,
    base_url: Url,
    dir: PathBuf,
    title_chars: usize,
}

impl ImageStore {
    /// `base_url` resolves relative image references; `dir` must already exist.
    /// Each download is bounded by `timeout`.
    pub fn new(
        base_url: Url,
        dir: impl Into<PathBuf>,
        title_chars: usize,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            dir: dir.into(),
            title_chars,
        })
    }

    /// Save the image for an article and return the filename to report.
    #[instrument(level = "debug", skip(self))]
    pub async fn save(&self, title: &str, src: Option<&str>) -> String {
        let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) else {
            debug!("No image reference");
            return IMAGE_NOT_AVAILABLE.to_string();
        };

        let filename = image_filename(title, self.title_chars);
        match self.download(src, &filename).await {
            Ok(Some(saved)) => saved,
            Ok(None) => IMAGE_NOT_AVAILABLE.to_string(),
            Err(e) => {
                warn!(%src, error = %e, "Image download failed");
                IMAGE_NOT_AVAILABLE.to_string()
            }
        }
    }

    /// Fetch `src` and write it under a free variant of `filename`.
    /// Returns the name written, or `None` on a non-success status.
    async fn download(&self, src: &str, filename: &str) -> Result<Option<String>, Box<dyn Error>> {
        let url = self.base_url.join(src)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Image request returned non-success status");
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        let filename = self.free_filename(filename).await;
        let path = self.dir.join(&filename);
        fs::write(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved article image");
        Ok(Some(filename))
    }

    async fn free_filename(&self, filename: &str) -> String {
        let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename, IMAGE_EXTENSION));
        let mut candidate = filename.to_string();
        let mut n = 1;
        while fs::try_exists(self.dir.join(&candidate)).await.unwrap_or(false) {
            n += 1;
            candidate = format!("{stem}_{n}.{ext}");
        }
        if n > 1 {
            debug!(%filename, %candidate, "Image name taken; using numbered name");
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0 not really a jpeg";

    fn store_at(base: Url, dir: &std::path::Path) -> ImageStore {
        ImageStore::new(base, dir, 30, Duration::from_secs(5)).unwrap()
    }

    fn store(dir: &std::path::Path) -> ImageStore {
        store_at(Url::parse("https://apnews.com/").unwrap(), dir)
    }

    fn saved_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Local HTTP responder: `/photo.jpg` answers 200 with [`IMAGE_BYTES`],
    /// every other path answers 404.
    async fn image_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let (status, body): (&str, &[u8]) = if request.starts_with("GET /photo.jpg ") {
                    ("200 OK", IMAGE_BYTES)
                } else {
                    ("404 Not Found", b"missing")
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body).await;
                let _ = stream.shutdown().await;
            }
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_image_filename_truncates_and_replaces_spaces() {
        assert_eq!(image_filename("India win the toss", 30), "India_win_the_toss.jpg");
        assert_eq!(
            image_filename("England and Australia meet again at Lord's", 30),
            "England_and_Australia_meet_aga.jpg"
        );
        assert_eq!(image_filename("Short title here", 15), "Short_title_her.jpg");
    }

    #[test]
    fn test_image_filename_drops_path_characters() {
        assert_eq!(image_filename("Win/loss: what's next?", 30), "Winloss_what's_next.jpg");
        assert_eq!(image_filename("  ", 30), "image.jpg");
    }

    #[tokio::test]
    async fn test_missing_reference_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert_eq!(store.save("Cricket news today", None).await, IMAGE_NOT_AVAILABLE);
        assert_eq!(store.save("Cricket news today", Some("  ")).await, IMAGE_NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_unresolvable_reference_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert_eq!(
            store.save("Cricket news today", Some("http://[broken")).await,
            IMAGE_NOT_AVAILABLE
        );
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_success_status_writes_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(image_server().await, dir.path());

        let saved = store.save("India win the toss", Some("/photo.jpg")).await;
        assert_eq!(saved, "India_win_the_toss.jpg");
        assert_eq!(std::fs::read(dir.path().join(&saved)).unwrap(), IMAGE_BYTES);
    }

    #[tokio::test]
    async fn test_error_status_is_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(image_server().await, dir.path());

        let saved = store.save("India win the toss", Some("/gone.jpg")).await;
        assert_eq!(saved, IMAGE_NOT_AVAILABLE);
        assert!(saved_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_titles_sharing_a_prefix_get_numbered_names() {
        let dir = tempfile::tempdir().unwrap();
        let base = image_server().await;
        let store = store_at(base.clone(), dir.path());

        let first = store
            .save("England and Australia meet again at Lord's", Some("/photo.jpg"))
            .await;
        let absolute = base.join("photo.jpg").unwrap();
        let second = store
            .save("England and Australia meet again at the Oval", Some(absolute.as_str()))
            .await;
        let third = store
            .save("England and Australia meet again in Perth", Some("/photo.jpg"))
            .await;

        assert_eq!(first, "England_and_Australia_meet_aga.jpg");
        assert_eq!(second, "England_and_Australia_meet_aga_2.jpg");
        assert_eq!(third, "England_and_Australia_meet_aga_3.jpg");
        assert_eq!(saved_files(dir.path()), vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_stalled_download_is_not_available() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let store = ImageStore::new(base, dir.path(), 30, Duration::from_millis(200)).unwrap();
        let saved = tokio::time::timeout(
            Duration::from_secs(5),
            store.save("India win the toss", Some("/photo.jpg")),
        )
        .await
        .expect("client timeout should fire first");
        assert_eq!(saved, IMAGE_NOT_AVAILABLE);
        assert!(saved_files(dir.path()).is_empty());
    }
}
