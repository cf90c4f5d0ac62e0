// Fetch the processed output behind an OutputLink

use crate::models::OutputLink;
use crate::types::{AppError, AppResult};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const FALLBACK_FILE_NAME: &str = "output.csv";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Stream the output file into `dir`, named after the link's last path segment.
///
/// The body lands in a hidden `.part` file first and is renamed into place only
/// once it has been fully written. An existing file is never replaced: the name
/// gets a ` (n)` suffix instead.
pub async fn download_output(client: &Client, link: &OutputLink, dir: &Path) -> AppResult<PathBuf> {
    let response = client.get(link.as_str()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Download(format!("{} returned {}", link, status)));
    }

    tokio::fs::create_dir_all(dir).await?;
    let path = unused_path(dir, &output_file_name(link)).await?;
    let temp_path = part_path(&path);

    let written = match write_body(response, &temp_path).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&temp_path).await {
                warn!(path = %temp_path.display(), error = %rm, "Failed to remove partial download");
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&temp_path, &path).await?;

    info!(path = %path.display(), bytes = written, "Output file saved");
    Ok(path)
}

async fn write_body(response: Response, path: &Path) -> AppResult<usize> {
    let mut file = tokio::fs::File::create(path).await?;

    let mut stream = response.bytes_stream();
    let mut written = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    Ok(written)
}

/// `dir/name`, or `dir/stem (n).ext` for the first `n` not already taken
async fn unused_path(dir: &Path, name: &str) -> AppResult<PathBuf> {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };

    for n in 1..=MAX_NAME_ATTEMPTS {
        let numbered = match extension {
            Some(extension) => format!("{stem} ({n}).{extension}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(numbered);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::Download(format!(
        "No free file name for {} in {}",
        name,
        dir.display()
    )))
}

fn part_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    path.with_file_name(format!(".{name}.part"))
}

/// Last non-empty path segment of the link, without query or fragment
pub fn output_file_name(link: &OutputLink) -> String {
    let without_query = link
        .as_str()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);

    // First segment is the host
    after_scheme
        .split('/')
        .skip(1)
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        let name = |s: &str| output_file_name(&OutputLink::new(s));
        assert_eq!(name("https://out/y"), "y");
        assert_eq!(
            name("https://bucket.s3.amazonaws.com/out/patents_normalized.csv?X-Amz-Signature=1"),
            "patents_normalized.csv"
        );
        assert_eq!(name("https://out/dir/"), "dir");
        assert_eq!(name("https://out"), FALLBACK_FILE_NAME);
        assert_eq!(name("https://out/.."), FALLBACK_FILE_NAME);
    }

    #[tokio::test]
    async fn test_download_output_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/results/patents_out.csv")
            .with_status(200)
            .with_body("patent_id,organization\nUS1,ACME\n")
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let link = OutputLink::new(format!("{}/results/patents_out.csv", server.url()));

        let path = download_output(&Client::new(), &link, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("patents_out.csv"));
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "patent_id,organization\nUS1,ACME\n"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_output_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.csv")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let link = OutputLink::new(format!("{}/gone.csv", server.url()));

        let err = download_output(&Client::new(), &link, dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Download(_)));
        assert!(!dir.path().join("gone.csv").exists());
    }

    #[tokio::test]
    async fn test_existing_file_is_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/patents.csv")
            .with_status(200)
            .with_body("normalized")
            .create_async()
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let original = dir.path().join("patents.csv");
        tokio::fs::write(&original, "ORIGINAL USER INPUT").await.unwrap();
        let link = OutputLink::new(format!("{}/patents.csv", server.url()));

        let path = download_output(&Client::new(), &link, dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("patents (1).csv"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "normalized");
        assert_eq!(
            tokio::fs::read_to_string(&original).await.unwrap(),
            "ORIGINAL USER INPUT"
        );
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_directory_untouched() {
        use tokio::io::AsyncReadExt;

        // Promises 100 bytes, sends 7, then hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = tempfile::TempDir::new().unwrap();
        let original = dir.path().join("patents.csv");
        tokio::fs::write(&original, "ORIGINAL USER INPUT").await.unwrap();
        let link = OutputLink::new(format!("http://{addr}/patents.csv"));

        let result = download_output(&Client::new(), &link, dir.path()).await;
        server.await.unwrap();

        assert!(result.is_err());
        assert_eq!(
            tokio::fs::read_to_string(&original).await.unwrap(),
            "ORIGINAL USER INPUT"
        );
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("patents.csv")]);
    }

    #[test]
    fn test_part_path_is_hidden_sibling() {
        assert_eq!(
            part_path(Path::new("/tmp/out/patents (1).csv")),
            PathBuf::from("/tmp/out/.patents (1).csv.part")
        );
    }
}
