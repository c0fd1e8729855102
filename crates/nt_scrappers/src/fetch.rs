use async_trait::async_trait;
use nt_core::{Error, Fetcher, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Pause between attempts grows linearly with the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// `Fetcher` over a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::fetch(url, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::fetch(url, format!("status {}", status)));
            }
            let body = response.bytes().await.map_err(|e| Error::fetch(url, e))?;
            Ok::<_, Error>(body.to_vec())
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| Error::fetch(url, format!("timed out after {:?}", timeout)))?
    }
}

/// Fetch `url`, retrying retryable failures up to `retries` extra times.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
    retries: u32,
) -> Result<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url, timeout).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                debug!(%url, attempt, error = %e, "retrying fetch");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetch and decode as text; invalid UTF-8 is replaced rather than rejected.
pub async fn fetch_text(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
    retries: u32,
) -> Result<String> {
    let body = fetch_with_retry(fetcher, url, timeout, retries).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyFetcher {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::fetch(url, "connection reset"))
            } else {
                Ok(b"<html></html>".to_vec())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let fetcher = FlakyFetcher { failures: 2, calls: AtomicU32::new(0) };
        let body = fetch_text(&fetcher, "https://example.com", Duration::from_secs(1), 2).await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retry_budget() {
        let fetcher = FlakyFetcher { failures: 5, calls: AtomicU32::new(0) };
        let err = fetch_with_retry(&fetcher, "https://example.com", Duration::from_secs(1), 1).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_return_immediately() {
        struct Broken;

        #[async_trait]
        impl Fetcher for Broken {
            async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
                Err(Error::InvalidUrl("not a url".to_string()))
            }
        }

        let err = fetch_with_retry(&Broken, "::", Duration::from_secs(1), 3).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
