//! LSP base-protocol framing (`Content-Length` headers)

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BridgeError, Result};

/// Largest message body accepted from a server
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024 * 1024;

/// Upfront allocation for a body; the buffer grows as bytes arrive
const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// Read one framed message body
///
/// Returns `Ok(None)` when the stream ends cleanly between messages.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;

        if read == 0 {
            if saw_header {
                return Err(BridgeError::Protocol(
                    "Stream closed inside message header".to_string(),
                ));
            }
            return Ok(None);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let length = value.trim().parse().map_err(|e| {
                    BridgeError::Protocol(format!("Invalid Content-Length: {}", e))
                })?;
                content_length = Some(length);
            }
        }
    }

    let content_length = content_length
        .ok_or_else(|| BridgeError::Protocol("Missing Content-Length header".to_string()))?;

    if content_length > MAX_MESSAGE_BYTES {
        return Err(BridgeError::Protocol(format!(
            "Content-Length {} exceeds limit of {} bytes",
            content_length, MAX_MESSAGE_BYTES
        )));
    }

    let mut content = Vec::with_capacity(content_length.min(INITIAL_BODY_CAPACITY));
    (&mut *reader)
        .take(content_length as u64)
        .read_to_end(&mut content)
        .await?;
    if content.len() < content_length {
        return Err(BridgeError::Protocol(format!(
            "Stream closed after {} of {} body bytes",
            content.len(),
            content_length
        )));
    }

    String::from_utf8(content)
        .map(Some)
        .map_err(|e| BridgeError::Protocol(format!("Invalid UTF-8: {}", e)))
}

/// Write one framed message body and flush
pub async fn write_message<W>(writer: &mut W, json: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", json.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_single_message() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Length: 2\r\n\r\n{}")
            .build();
        let mut reader = BufReader::new(mock);

        assert_eq!(read_message(&mut reader).await.unwrap().as_deref(), Some("{}"));
        assert_eq!(read_message(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_ignores_extra_headers_and_case() {
        let body = r#"{"jsonrpc":"2.0"}"#;
        let framed = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
            body.len(),
            body
        );
        let mock = tokio_test::io::Builder::new().read(framed.as_bytes()).build();
        let mut reader = BufReader::new(mock);

        assert_eq!(read_message(&mut reader).await.unwrap().as_deref(), Some(body));
    }

    #[tokio::test]
    async fn test_read_split_across_chunks() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Len")
            .read(b"gth: 5\r\n")
            .read(b"\r\nhel")
            .read(b"lo")
            .build();
        let mut reader = BufReader::new(mock);

        assert_eq!(read_message(&mut reader).await.unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Type: text/plain\r\n\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        assert!(matches!(
            read_message(&mut reader).await,
            Err(BridgeError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let mock = tokio_test::io::Builder::new().read(b"Content-Length: 4\r\n").build();
        let mut reader = BufReader::new(mock);

        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Length: 900000000000000\r\n\r\n{}")
            .build();
        let mut reader = BufReader::new(mock);

        match read_message(&mut reader).await {
            Err(BridgeError::Protocol(msg)) => assert!(msg.contains("exceeds limit")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let mock = tokio_test::io::Builder::new()
            .read(b"Content-Length: 10\r\n\r\n{}")
            .build();
        let mut reader = BufReader::new(mock);

        assert!(matches!(
            read_message(&mut reader).await,
            Err(BridgeError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_write_message() {
        let mut mock = tokio_test::io::Builder::new()
            .write(b"Content-Length: 2\r\n\r\n")
            .write(b"{}")
            .build();

        write_message(&mut mock, "{}").await.unwrap();
    }

    #[tokio::test]
    async fn test_content_length_counts_bytes() {
        let (mut client, server) = tokio::io::duplex(256);

        write_message(&mut client, r#"{"title":"λ"}"#).await.unwrap();

        let mut reader = BufReader::new(server);
        assert_eq!(
            read_message(&mut reader).await.unwrap().as_deref(),
            Some(r#"{"title":"λ"}"#)
        );
    }
}
