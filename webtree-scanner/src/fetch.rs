use crate::error::{CrawlError, Result};
use crate::normalize::resolve_relative;
use crate::options::CrawlOptions;
use reqwest::Client;
use reqwest::header::{HeaderMap, LOCATION};
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A fetched page: the URL that was requested, the response body and headers.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub url: String,
    pub body: String,
    pub headers: HeaderMap,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            headers,
        }
    }
}

/// Issues a single GET for the scheduler.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Page>> + Send;
}

pub struct HttpFetcher {
    client: Client,
    headers: HeaderMap,
    timeout: Duration,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(options: &CrawlOptions) -> Result<Self> {
        // Redirects are followed by hand so relative locations, missing
        // locations and the hop limit are classified here.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(options.request_timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            headers: options.header_map(),
            timeout: options.request_timeout,
            max_redirects: options.max_redirects,
        })
    }

    async fn follow(&self, url: &str) -> Result<Page> {
        let mut current = url.to_string();
        let mut hops = 0;

        loop {
            debug!("Fetching {}", current);

            let response = self
                .client
                .get(&current)
                .headers(self.headers.clone())
                .send()
                .await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| CrawlError::FailedRedirect(current.clone()))?;

                if hops >= self.max_redirects {
                    return Err(CrawlError::TooManyRedirects {
                        url: url.to_string(),
                        limit: self.max_redirects,
                    });
                }
                hops += 1;

                let next = match Url::parse(location) {
                    Ok(absolute) => absolute.to_string(),
                    Err(_) => {
                        let base = Url::parse(&current)
                            .map_err(|_| CrawlError::InvalidUrl(current.clone()))?;
                        resolve_relative(&base, location)
                            .ok_or_else(|| CrawlError::FailedRedirect(current.clone()))?
                    }
                };

                debug!("{} redirected ({}) to {}", current, status.as_u16(), next);
                current = next;
                continue;
            }

            if status.is_client_error() {
                return Err(CrawlError::StatusError {
                    url: current,
                    code: status.as_u16(),
                });
            }

            let headers = response.headers().clone();
            let body = response.text().await?;

            return Ok(Page {
                url: url.to_string(),
                body,
                headers,
            });
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        match tokio::time::timeout(self.timeout, self.follow(url)).await {
            Ok(result) => result,
            Err(_) => Err(CrawlError::RequestTimeout(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn fetcher(options: CrawlOptions) -> HttpFetcher {
        HttpFetcher::new(&options).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-baz", "http://bar.foo.com")
                    .set_body_string("hello"),
            )
            .mount(&mock_server)
            .await;

        let page = fetcher(CrawlOptions::new())
            .fetch(&mock_server.uri())
            .await
            .unwrap();

        assert_eq!(page.body, "hello");
        assert_eq!(page.headers.get("x-baz").unwrap(), "http://bar.foo.com");
    }

    #[tokio::test]
    async fn test_server_error_is_not_a_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&mock_server)
            .await;

        let page = fetcher(CrawlOptions::new())
            .fetch(&mock_server.uri())
            .await
            .unwrap();

        assert_eq!(page.body, "oops");
    }

    #[tokio::test]
    async fn test_sends_default_user_agent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("user-agent", crate::options::DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        fetcher(CrawlOptions::new())
            .fetch(&mock_server.uri())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sends_configured_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("user-agent", "custom-agent"))
            .and(header("cookie", "a=1; b=2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = CrawlOptions::new()
            .with_header("user-agent", "custom-agent")
            .with_header("cookie", vec!["a=1".to_string(), "b=2".to_string()]);

        fetcher(options).fetch(&mock_server.uri()).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_headers_are_skipped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("x-token", "abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let options = CrawlOptions::new()
            .with_header("bad name", "v")
            .with_header("x-bell", "a\u{7}b")
            .with_header("x-token", "abc");

        let page = fetcher(options).fetch(&mock_server.uri()).await.unwrap();
        assert_eq!(page.url, mock_server.uri());
    }

    #[tokio::test]
    async fn test_relative_redirect_is_followed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/foobar"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/foobar"))
            .respond_with(ResponseTemplate::new(200).set_body_string("landed"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/start", mock_server.uri());
        let page = fetcher(CrawlOptions::new()).fetch(&url).await.unwrap();

        assert_eq!(page.body, "landed");
        assert_eq!(page.url, url);
    }

    #[tokio::test]
    async fn test_absolute_redirect_is_followed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("new"))
            .mount(&mock_server)
            .await;

        let page = fetcher(CrawlOptions::new())
            .fetch(&format!("{}/old", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(page.body, "new");
    }

    #[tokio::test]
    async fn test_redirect_without_location_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(301))
            .mount(&mock_server)
            .await;

        let result = fetcher(CrawlOptions::new()).fetch(&mock_server.uri()).await;

        assert!(matches!(result, Err(CrawlError::FailedRedirect(_))));
    }

    #[tokio::test]
    async fn test_client_error_carries_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = fetcher(CrawlOptions::new()).fetch(&mock_server.uri()).await;

        match result {
            Err(CrawlError::StatusError { code, .. }) => assert_eq!(code, 404),
            other => panic!("expected StatusError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_loop_is_capped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/b"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/a"))
            .mount(&mock_server)
            .await;

        let result = fetcher(CrawlOptions::new().with_max_redirects(4))
            .fetch(&format!("{}/a", mock_server.uri()))
            .await;

        match result {
            Err(CrawlError::TooManyRedirects { limit, .. }) => assert_eq!(limit, 4),
            other => panic!("expected TooManyRedirects, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let options = CrawlOptions::new().with_request_timeout(Duration::from_millis(50));
        let result = fetcher(options).fetch(&mock_server.uri()).await;

        assert!(matches!(result, Err(CrawlError::RequestTimeout(_))));
    }
}
