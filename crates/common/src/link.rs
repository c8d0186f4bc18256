// Share links: a single query parameter carrying a share token.

use url::Url;

use crate::share::{self, DecodeStage, ShareError};
use crate::types::SharePayload;

/// Query parameter that carries the share token.
pub const SHARE_QUERY_PARAM: &str = "code";

/// Parameters the host page was opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub share_token: Option<String>,
}

impl LaunchParams {
    /// Extract launch parameters from a page URL.
    pub fn from_url(url: &Url) -> Self {
        let share_token = url
            .query_pairs()
            .find(|(key, _)| key == SHARE_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());
        Self { share_token }
    }

    pub fn with_share_token(token: impl Into<String>) -> Self {
        Self { share_token: Some(token.into()) }
    }
}

/// Build a link to `base` that carries `payload`. Any existing share
/// parameter on `base` is replaced; other query pairs are kept.
pub fn share_link(base: &Url, payload: &SharePayload) -> Result<Url, ShareError> {
    let token = share::encode(payload)?;
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != SHARE_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut().clear().extend_pairs(retained).append_pair(SHARE_QUERY_PARAM, &token);
    Ok(url)
}

/// Decode a full share link or a bare token.
pub fn parse_share_input(input: &str) -> Result<SharePayload, ShareError> {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) => {
            let token = LaunchParams::from_url(&url).share_token.ok_or_else(|| {
                ShareError::Decoding {
                    stage: DecodeStage::Unescape,
                    reason: format!("link has no `{SHARE_QUERY_PARAM}` parameter"),
                }
            })?;
            share::decode(&token)
        }
        Err(_) => share::decode(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SharePayload {
        SharePayload { content: "board.create('point', [0, 0]);".into(), version: "0.3.1".into() }
    }

    #[test]
    fn link_round_trips_through_launch_params() {
        let base = Url::parse("https://boardpad.dev/editor").unwrap();
        let link = share_link(&base, &payload()).unwrap();

        let params = LaunchParams::from_url(&link);
        let token = params.share_token.expect("link should carry a token");
        assert_eq!(share::decode(&token).unwrap(), payload());
    }

    #[test]
    fn link_replaces_existing_token_and_keeps_other_pairs() {
        let base = Url::parse("https://boardpad.dev/editor?theme=dark&code=stale").unwrap();
        let link = share_link(&base, &payload()).unwrap();

        let codes: Vec<_> = link.query_pairs().filter(|(k, _)| k == SHARE_QUERY_PARAM).collect();
        assert_eq!(codes.len(), 1);
        assert_ne!(codes[0].1, "stale");
        assert!(link.query_pairs().any(|(k, v)| k == "theme" && v == "dark"));
    }

    #[test]
    fn launch_params_ignore_empty_token() {
        let url = Url::parse("https://boardpad.dev/editor?code=").unwrap();
        assert_eq!(LaunchParams::from_url(&url), LaunchParams::default());
    }

    #[test]
    fn parse_share_input_accepts_link_and_bare_token() {
        let base = Url::parse("https://boardpad.dev/editor").unwrap();
        let link = share_link(&base, &payload()).unwrap();
        let token = share::encode(&payload()).unwrap();

        assert_eq!(parse_share_input(link.as_str()).unwrap(), payload());
        assert_eq!(parse_share_input(&token).unwrap(), payload());
    }

    #[test]
    fn parse_share_input_rejects_link_without_token() {
        let err = parse_share_input("https://boardpad.dev/editor?theme=dark").unwrap_err();
        assert!(err.to_string().contains("code"));
    }
}
