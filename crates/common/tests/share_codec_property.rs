use boardpad_common::link::{parse_share_input, share_link};
use boardpad_common::share::{decode, encode};
use boardpad_common::types::SharePayload;
use proptest::collection::vec;
use proptest::prelude::*;
use url::Url;

fn source_char() -> impl Strategy<Value = char> {
    prop_oneof![
        (b'a'..=b'z').prop_map(char::from),
        (b'A'..=b'Z').prop_map(char::from),
        (b'0'..=b'9').prop_map(char::from),
        Just(' '),
        Just('\n'),
        Just('\r'),
        Just('\t'),
        Just('"'),
        Just('\\'),
        Just('%'),
        Just('&'),
        Just('='),
        Just('?'),
        Just('#'),
        Just('+'),
        Just('/'),
        Just('{'),
        Just('}'),
        Just('π'),
        Just('中'),
        Just('🙂'),
    ]
}

fn source_text(max_len: usize) -> impl Strategy<Value = String> {
    vec(source_char(), 0..max_len).prop_map(|chars| chars.into_iter().collect())
}

fn version_string() -> impl Strategy<Value = String> {
    (0u8..10, 0u8..20, 0u8..50).prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn decode_inverts_encode(content in source_text(600), version in version_string()) {
        let payload = SharePayload { content, version };
        let token = encode(&payload).expect("encode should succeed");
        prop_assert_eq!(decode(&token).expect("decode should succeed"), payload);
    }

    #[test]
    fn arbitrary_version_strings_survive(content in source_text(64), version in source_text(24)) {
        let payload = SharePayload { content, version };
        let token = encode(&payload).expect("encode should succeed");
        prop_assert_eq!(decode(&token).expect("decode should succeed"), payload);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_input(input in source_text(200)) {
        let _ = decode(&input);
    }
}

#[test]
fn share_link_survives_large_documents() {
    let content = "board.create('point', [Math.random(), Math.random()]);\n".repeat(2_000);
    let payload = SharePayload { content, version: "0.3.1".into() };
    let base = Url::parse("https://boardpad.dev/editor").expect("base url should parse");

    let link = share_link(&base, &payload).expect("link should build");
    assert!(link.as_str().len() < payload.content.len() / 10);
    assert_eq!(parse_share_input(link.as_str()).expect("link should decode"), payload);
}
