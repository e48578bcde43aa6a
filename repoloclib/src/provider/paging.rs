//! Shared HTTP fetch and pagination loop.
//!
//! Providers inject two things: how to build the URL for page `n`, and how to
//! decide from a decoded page whether another page follows.

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{DiscoveryFailure, Provider};
use crate::descriptor::RepositoryDescriptor;
use crate::error::{RepolocError, RequestContext};
use crate::http::{Auth, HttpClient, HttpRequest, HttpResponse};
use crate::Result;

/// Items requested per page from paginated listings.
pub(crate) const PAGE_SIZE: u32 = 100;

/// Fetch helper bound to one provider, organization and credential.
pub(crate) struct PagedFetch<'a> {
    pub http: &'a dyn HttpClient,
    pub provider: Provider,
    pub organization: &'a str,
    pub auth: Auth,
    pub accept: Option<&'static str>,
}

impl PagedFetch<'_> {
    fn context(&self, page: Option<u32>) -> RequestContext {
        let ctx = RequestContext::new(self.provider, self.organization);
        match page {
            Some(page) => ctx.page(page),
            None => ctx,
        }
    }

    /// GET `url` and decode a JSON body.
    ///
    /// Any status other than 200 is an error; the body is never decoded in
    /// that case.
    pub(crate) fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        page: Option<u32>,
    ) -> Result<(HttpResponse, T)> {
        let mut request = HttpRequest::get(url, self.auth.clone());
        if let Some(accept) = self.accept {
            request = request.accept(accept);
        }

        debug!(provider = %self.provider, url, "GET");
        let response = self
            .http
            .get(&request)
            .map_err(|e| RepolocError::Network {
                context: self.context(page),
                message: e.to_string(),
            })?;

        if !response.is_ok() {
            return Err(RepolocError::ProviderStatus {
                context: self.context(page),
                status: response.status,
            });
        }

        let body = serde_json::from_slice(&response.body).map_err(|e| RepolocError::Decode {
            context: self.context(page),
            message: e.to_string(),
        })?;

        Ok((response, body))
    }

    /// Walk pages 1, 2, ... until `has_next` says stop.
    ///
    /// Descriptors are emitted in page order. A failure on page `n` returns the
    /// descriptors of pages `1..n` alongside the error. An empty page that still
    /// signals continuation is a malformed response, not the end of the listing.
    pub(crate) fn fetch_pages<T, U, N, C>(
        &self,
        url_for_page: U,
        has_next: N,
        mut collect: C,
    ) -> std::result::Result<Vec<RepositoryDescriptor>, DiscoveryFailure>
    where
        T: DeserializeOwned,
        U: Fn(u32) -> Result<String>,
        N: Fn(&HttpResponse, &T) -> bool,
        C: FnMut(T) -> Vec<RepositoryDescriptor>,
    {
        let mut descriptors = Vec::new();
        let mut page = 1;

        loop {
            let fetched = url_for_page(page)
                .and_then(|url| self.fetch_json::<T>(&url, Some(page)));
            let (response, body) = match fetched {
                Ok(fetched) => fetched,
                Err(error) => {
                    return Err(DiscoveryFailure {
                        error,
                        partial: descriptors,
                    })
                }
            };

            let more = has_next(&response, &body);
            let items = collect(body);
            debug!(
                provider = %self.provider,
                page,
                items = items.len(),
                more,
                "fetched page"
            );

            if more && items.is_empty() {
                return Err(DiscoveryFailure {
                    error: RepolocError::Decode {
                        context: self.context(Some(page)),
                        message: "empty page still signals another page".to_string(),
                    },
                    partial: descriptors,
                });
            }

            descriptors.extend(items);
            if !more {
                break;
            }
            page += 1;
        }

        Ok(descriptors)
    }
}

/// Whether an RFC 8288 `Link` header carries a link with relation `rel`.
///
/// Handles quoted and bare values and space-separated relation lists, e.g.
/// `<https://x?page=2>; rel="next", <https://x?page=9>; rel="last"`.
pub(crate) fn link_has_relation(header: Option<&str>, rel: &str) -> bool {
    let Some(header) = header else {
        return false;
    };

    header.split(',').any(|link| {
        link.split(';').skip(1).any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case(rel))
        })
    })
}

/// `root` extended by `segments`, each encoded as one path segment, with
/// `query` appended as form-encoded pairs.
pub(crate) fn api_url(root: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let invalid = |message: String| RepolocError::InvalidUrl {
        url: root.to_string(),
        message,
    };

    let mut url = Url::parse(root).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base URL".to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedHttp;

    fn fetcher(http: &ScriptedHttp) -> PagedFetch<'_> {
        PagedFetch {
            http,
            provider: Provider::GitHub,
            organization: "acme",
            auth: Auth::Bearer("t".to_string()),
            accept: None,
        }
    }

    #[test]
    fn test_link_relations() {
        let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#;
        assert!(link_has_relation(Some(header), "next"));
        assert!(link_has_relation(Some(header), "last"));
        assert!(!link_has_relation(Some(header), "prev"));
        assert!(!link_has_relation(None, "next"));
        assert!(!link_has_relation(Some(""), "next"));
    }

    #[test]
    fn test_link_relation_lists_and_bare_values() {
        assert!(link_has_relation(Some("<a>; rel=\"prev first\""), "first"));
        assert!(link_has_relation(Some("<a>; rel=next"), "next"));
        // The URL itself mentioning a relation name does not count
        assert!(!link_has_relation(Some("<https://x/rel=\"next\">; rel=\"prev\""), "next"));
    }

    #[test]
    fn test_api_url_encodes_segments_and_query() {
        let url = api_url(
            "https://api.example/2.0",
            &["orgs", "My Project", "group/sub", "my-repo_1.0"],
            &[("per_page", "100"), ("ref", "feature/x y")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example/2.0/orgs/My%20Project/group%2Fsub/my-repo_1.0?per_page=100&ref=feature%2Fx+y"
        );

        let bare = api_url("https://api.example", &["orgs"], &[]).unwrap();
        assert_eq!(bare.as_str(), "https://api.example/orgs");

        assert!(matches!(
            api_url("not a url", &["x"], &[]),
            Err(RepolocError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_non_200_is_status_error_without_decoding() {
        let http = ScriptedHttp::new().respond("https://x/1", HttpResponse::json(403, "[]"));
        let err = fetcher(&http)
            .fetch_json::<Vec<serde_json::Value>>("https://x/1", Some(1))
            .unwrap_err();
        match err {
            RepolocError::ProviderStatus { context, status } => {
                assert_eq!(status, 403);
                assert_eq!(context.page, Some(1));
                assert_eq!(context.organization, "acme");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_and_decode_errors() {
        let http = ScriptedHttp::new()
            .fail("https://x/down", "connection refused")
            .respond("https://x/bad", HttpResponse::json(200, "{not json"));
        let f = fetcher(&http);

        let err = f
            .fetch_json::<Vec<serde_json::Value>>("https://x/down", None)
            .unwrap_err();
        assert!(matches!(err, RepolocError::Network { .. }));

        let err = f
            .fetch_json::<Vec<serde_json::Value>>("https://x/bad", None)
            .unwrap_err();
        assert!(matches!(err, RepolocError::Decode { .. }));
    }

    #[test]
    fn test_failure_keeps_earlier_pages() {
        let http = ScriptedHttp::new()
            .respond("https://x/1", HttpResponse::json(200, r#"["a","b"]"#))
            .respond("https://x/2", HttpResponse::json(500, ""));

        let failure = fetcher(&http)
            .fetch_pages::<Vec<String>, _, _, _>(
                |page| Ok(format!("https://x/{page}")),
                |_, _| true,
                |names| {
                    names
                        .into_iter()
                        .map(|n| RepositoryDescriptor::new("acme", None, n, None))
                        .collect()
                },
            )
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RepolocError::ProviderStatus { status: 500, .. }
        ));
        let names: Vec<&str> = failure.partial.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_page_with_continuation_is_malformed() {
        let http = ScriptedHttp::new()
            .respond("https://x/1", HttpResponse::json(200, r#"["a"]"#))
            .respond("https://x/2", HttpResponse::json(200, "[]"));

        let failure = fetcher(&http)
            .fetch_pages::<Vec<String>, _, _, _>(
                |page| Ok(format!("https://x/{page}")),
                |_, _| true,
                |names| {
                    names
                        .into_iter()
                        .map(|n| RepositoryDescriptor::new("acme", None, n, None))
                        .collect()
                },
            )
            .unwrap_err();

        match failure.error {
            RepolocError::Decode { context, .. } => assert_eq!(context.page, Some(2)),
            other => panic!("expected decode error, got {other:?}"),
        }
        let names: Vec<&str> = failure.partial.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(http.requested_urls().len(), 2);
    }
}
