//! Output file naming: `<host>_<timestamp>.png` under the output directory.

use crate::error::ScreenshotError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use url::{Host, Url};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Host part of the file name. IPv6 literals are written without brackets.
fn host_label(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    }
}

pub fn screenshot_file_name(url: &Url, now: DateTime<Local>) -> String {
    format!("{}_{}.png", host_label(url), now.format(TIMESTAMP_FORMAT))
}

pub fn screenshot_path(output_dir: &Path, url: &Url, now: DateTime<Local>) -> PathBuf {
    output_dir.join(screenshot_file_name(url, now))
}

/// Path for a capture of `url` taken now, creating `output_dir` if it went missing.
pub async fn prepare_screenshot_path(
    output_dir: &Path,
    url: &Url,
) -> Result<PathBuf, ScreenshotError> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        ScreenshotError::FileName(format!(
            "failed to ensure output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    Ok(screenshot_path(output_dir, url, Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_format() {
        let name = screenshot_file_name(&url("https://www.example.com/path?q=1"), at(9, 5, 7));
        assert_eq!(name, "www.example.com_2024-01-15_09-05-07.png");
    }

    #[test]
    fn test_port_and_userinfo_not_in_name() {
        let name = screenshot_file_name(&url("http://user:pw@example.com:8080/"), at(12, 0, 0));
        assert_eq!(name, "example.com_2024-01-15_12-00-00.png");
    }

    #[test]
    fn test_ip_hosts() {
        assert_eq!(
            screenshot_file_name(&url("http://127.0.0.1:3000/"), at(12, 0, 0)),
            "127.0.0.1_2024-01-15_12-00-00.png"
        );
        assert_eq!(
            screenshot_file_name(&url("http://[::1]:3000/"), at(12, 0, 0)),
            "::1_2024-01-15_12-00-00.png"
        );
    }

    #[test]
    fn test_names_unique_per_host_and_timestamp() {
        let a = screenshot_file_name(&url("https://a.example"), at(12, 0, 0));
        let b = screenshot_file_name(&url("https://b.example"), at(12, 0, 0));
        let a_later = screenshot_file_name(&url("https://a.example"), at(12, 0, 1));
        assert_ne!(a, b);
        assert_ne!(a, a_later);
        assert_ne!(b, a_later);
    }

    #[test]
    fn test_path_under_output_dir() {
        let dir = Path::new("/var/shots");
        let path = screenshot_path(dir, &url("https://example.com"), at(8, 30, 0));
        assert_eq!(path.parent(), Some(dir));
        assert!(path.starts_with(dir));
    }

    #[tokio::test]
    async fn test_prepare_recreates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");

        let path = prepare_screenshot_path(&dir, &url("https://example.com"))
            .await
            .unwrap();

        assert!(dir.is_dir());
        assert_eq!(path.parent(), Some(dir.as_path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("example.com_"));
        assert!(name.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_prepare_fails_when_dir_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let err = prepare_screenshot_path(&file, &url("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScreenshotError::FileName(_)));
    }
}
