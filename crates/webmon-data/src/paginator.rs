//! Cursor-chained pagination over an [`ApiTransport`].
//!
//! A [`Paginator`] is a finite, one-shot sequence of pages. Each call to
//! [`Paginator::next_page`] issues exactly one request carrying the fixed
//! parameters plus the continuation token handed out by the previous page.
//! Pages are fetched strictly one after another because every request
//! depends on the cursor returned by its predecessor.

use serde::de::DeserializeOwned;
use tracing::debug;

use webmon_core::models::Page;
use webmon_core::Result;

use crate::client::{ApiTransport, CallContext};

/// Query parameter carrying the cursor.
pub const CONTINUATION_TOKEN_PARAM: &str = "continuationToken";

/// Turns a response body into a page of items.
pub type PageDecoder<T> = fn(&[u8]) -> Result<Page<T>>;

/// Decode a JSON envelope `R` and convert it into a [`Page`].
pub fn decode_page<R, T>(body: &[u8]) -> Result<Page<T>>
where
    R: DeserializeOwned + Into<Page<T>>,
{
    let envelope: R = serde_json::from_slice(body)?;
    Ok(envelope.into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// No request issued yet.
    Start,
    /// The server handed out this token for the next request.
    Next(String),
    /// Last page seen, or a request failed.
    Exhausted,
}

/// Sequential page fetcher for one collection.
pub struct Paginator<'a, T> {
    transport: &'a dyn ApiTransport,
    ctx: &'a CallContext,
    path: &'a str,
    params: Vec<(&'static str, String)>,
    decode: PageDecoder<T>,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<'a, T> Paginator<'a, T> {
    pub fn new(
        transport: &'a dyn ApiTransport,
        ctx: &'a CallContext,
        path: &'a str,
        params: Vec<(&'static str, String)>,
        decode: PageDecoder<T>,
    ) -> Self {
        Self {
            transport,
            ctx,
            path,
            params,
            decode,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    /// Number of pages successfully fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// `true` once no further request will be issued.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the previous page carried no continuation
    /// token. After an error the sequence is exhausted; the failed page is
    /// never retried.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let token = match std::mem::replace(&mut self.cursor, Cursor::Exhausted) {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        self.ctx.check_cancelled()?;

        let mut params = self.params.clone();
        if let Some(token) = &token {
            params.push((CONTINUATION_TOKEN_PARAM, token.clone()));
        }

        debug!(
            path = self.path,
            page = self.pages_fetched + 1,
            continuation_token = token.as_deref().unwrap_or(""),
            "requesting page"
        );

        let body = self.transport.get(self.ctx, self.path, &params).await?;
        let page = (self.decode)(&body)?;
        self.pages_fetched += 1;

        debug!(
            path = self.path,
            items = page.items.len(),
            has_more = page.continuation_token.is_some(),
            "page received"
        );

        if let Some(next) = page.continuation_token {
            self.cursor = Cursor::Next(next);
        }

        Ok(Some(page.items))
    }

    /// Drain every remaining page and concatenate the items in page order.
    ///
    /// Any failing page fails the whole collection; nothing partial is
    /// returned.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        debug!(
            path = self.path,
            pages = self.pages_fetched,
            items = items.len(),
            "pagination finished"
        );
        Ok(items)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use serde::Deserialize;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use webmon_core::MonitorError;

    const PATH: &str = "/things";

    #[derive(Deserialize)]
    struct NumbersResponse {
        numbers: Vec<u32>,
        #[serde(rename = "continuationToken", default)]
        continuation_token: Option<String>,
    }

    impl From<NumbersResponse> for Page<u32> {
        fn from(r: NumbersResponse) -> Self {
            Page::new(r.numbers, r.continuation_token)
        }
    }

    fn ctx() -> CallContext {
        CallContext::new("tok", CancellationToken::new())
    }

    fn paginator<'a>(
        transport: &'a ScriptedTransport,
        ctx: &'a CallContext,
        params: Vec<(&'static str, String)>,
    ) -> Paginator<'a, u32> {
        Paginator::new(
            transport,
            ctx,
            PATH,
            params,
            decode_page::<NumbersResponse, u32>,
        )
    }

    #[tokio::test]
    async fn test_single_page_without_token() {
        let transport = ScriptedTransport::new().with_json(PATH, json!({"numbers": [1, 2, 3]}));
        let ctx = ctx();

        let items = paginator(&transport, &ctx, vec![]).collect_all().await.unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(transport.request_count(), 1);
        assert!(transport.requests()[0].param(CONTINUATION_TOKEN_PARAM).is_none());
    }

    #[tokio::test]
    async fn test_pages_concatenate_in_order_and_forward_tokens() {
        let transport = ScriptedTransport::new()
            .with_json(PATH, json!({"numbers": [1, 2], "continuationToken": "t1"}))
            .with_json(PATH, json!({"numbers": [], "continuationToken": "t/2=="}))
            .with_json(PATH, json!({"numbers": [3], "continuationToken": ""}));
        let ctx = ctx();

        let items = paginator(&transport, &ctx, vec![("monitorid", "m1".to_string())])
            .collect_all()
            .await
            .unwrap();

        assert_eq!(items, vec![1, 2, 3]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].param(CONTINUATION_TOKEN_PARAM), None);
        assert_eq!(requests[1].param(CONTINUATION_TOKEN_PARAM), Some("t1"));
        assert_eq!(requests[2].param(CONTINUATION_TOKEN_PARAM), Some("t/2=="));
        // Fixed parameters are re-sent on every page.
        assert!(requests.iter().all(|r| r.param("monitorid") == Some("m1")));
        assert!(requests.iter().all(|r| r.api_token == "tok"));
    }

    #[tokio::test]
    async fn test_next_page_stops_after_last_page() {
        let transport = ScriptedTransport::new().with_json(PATH, json!({"numbers": [9]}));
        let ctx = ctx();
        let mut pages = paginator(&transport, &ctx, vec![]);

        assert_eq!(pages.next_page().await.unwrap(), Some(vec![9]));
        assert!(pages.is_exhausted());
        assert_eq!(pages.next_page().await.unwrap(), None);
        assert_eq!(pages.pages_fetched(), 1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_aborts_without_partial_results() {
        let transport = ScriptedTransport::new()
            .with_json(PATH, json!({"numbers": [1], "continuationToken": "t1"}))
            .with_error(PATH, MonitorError::Status("502 Bad Gateway".to_string()))
            .with_json(PATH, json!({"numbers": [2]}));
        let ctx = ctx();

        let err = paginator(&transport, &ctx, vec![])
            .collect_all()
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Status(_)));
        // No retry of the failed page, no request after it.
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_page_is_parse_error() {
        let transport = ScriptedTransport::new()
            .with_json(PATH, json!({"numbers": [1], "continuationToken": "t1"}))
            .with_body(PATH, b"<html>oops</html>".to_vec());
        let ctx = ctx();

        let err = paginator(&transport, &ctx, vec![])
            .collect_all()
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::JsonParse(_)));
    }

    #[tokio::test]
    async fn test_cancellation_between_pages() {
        let cancel = CancellationToken::new();
        let transport = ScriptedTransport::new()
            .with_json(PATH, json!({"numbers": [1], "continuationToken": "t1"}))
            .with_json(PATH, json!({"numbers": [2]}))
            .cancel_after(1, cancel.clone());
        let ctx = CallContext::new("tok", cancel);

        let err = paginator(&transport, &ctx, vec![])
            .collect_all()
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_same_script_twice_is_identical() {
        let script = || {
            ScriptedTransport::new()
                .with_json(PATH, json!({"numbers": [4, 5], "continuationToken": "x"}))
                .with_json(PATH, json!({"numbers": [6]}))
        };
        let ctx = ctx();

        let first_transport = script();
        let second_transport = script();
        let first = paginator(&first_transport, &ctx, vec![]).collect_all().await.unwrap();
        let second = paginator(&second_transport, &ctx, vec![]).collect_all().await.unwrap();

        assert_eq!(first, second);
    }
}
