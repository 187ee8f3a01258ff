//! Access-token handling for playable links.
use super::error::ResolutionError;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Query parameter the cloud drive expects the bearer token in.
pub const DEFAULT_TOKEN_PARAM: &str = "access_token";

const PLAYABLE_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

/// Source of the currently valid bearer token. Token refresh happens elsewhere; this is
/// read at every hand-off.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> String;
}

/// A token that can be rotated while a session is running.
#[derive(Debug, Clone, Default)]
pub struct SharedToken(Arc<RwLock<String>>);

impl SharedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(token.into())))
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = token.into();
    }
}

impl TokenProvider for SharedToken {
    fn access_token(&self) -> String {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

pub fn has_playable_scheme(url: &str) -> bool {
    PLAYABLE_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Returns `url` with every `param` query parameter removed and exactly one
/// `param=token` appended.
pub fn with_access_token(url: &str, token: &str, param: &str) -> Result<String, ResolutionError> {
    let mut parsed = Url::parse(url)?;
    let kept = retained_pairs(&parsed, param);
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, token);
    Ok(parsed.into())
}

/// Removes every `param` query parameter. Unparseable input is returned unchanged.
pub fn strip_access_token(url: &str, param: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let kept = retained_pairs(&parsed, param);
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.into()
}

fn retained_pairs(url: &Url, param: &str) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_values(url: &str) -> Vec<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .filter(|(key, _)| key == DEFAULT_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    #[test]
    fn test_token_is_appended() {
        let url = with_access_token("https://d.example.com/file/abc?fid=1", "tok", DEFAULT_TOKEN_PARAM)
            .unwrap();
        assert_eq!(token_values(&url), vec!["tok"]);
        assert!(url.contains("fid=1"));
    }

    #[test]
    fn test_stale_tokens_are_replaced_by_exactly_one() {
        let url = with_access_token(
            "https://d.example.com/file?access_token=old&x=1&access_token=older",
            "new",
            DEFAULT_TOKEN_PARAM,
        )
        .unwrap();
        assert_eq!(token_values(&url), vec!["new"]);
        assert!(url.contains("x=1"));
    }

    #[test]
    fn test_strip_removes_token_and_empty_query() {
        assert_eq!(
            strip_access_token("https://d.example.com/f?access_token=t", DEFAULT_TOKEN_PARAM),
            "https://d.example.com/f"
        );
        assert_eq!(
            strip_access_token("https://d.example.com/f?a=1&access_token=t", DEFAULT_TOKEN_PARAM),
            "https://d.example.com/f?a=1"
        );
        assert_eq!(strip_access_token("not a url", DEFAULT_TOKEN_PARAM), "not a url");
    }

    #[test]
    fn test_malformed_url_is_an_error() {
        assert!(with_access_token("relative/path.mp4", "t", DEFAULT_TOKEN_PARAM).is_err());
    }

    #[test]
    fn test_playable_schemes() {
        assert!(has_playable_scheme("HTTPS://d.example.com/x"));
        assert!(has_playable_scheme("http://d.example.com/x"));
        assert!(has_playable_scheme("file:///tmp/x.mp4"));
        assert!(!has_playable_scheme("ftp://d.example.com/x"));
        assert!(!has_playable_scheme("/videos/x.mp4"));
    }

    #[test]
    fn test_shared_token_rotation_is_visible_to_clones() {
        let token = SharedToken::new("first");
        let handle = token.clone();
        token.set("second");
        assert_eq!(handle.access_token(), "second");
    }
}
