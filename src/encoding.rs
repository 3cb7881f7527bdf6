//! # Encoding Resolution
//!
//! Project files come in whatever codepage the authoring machine used,
//! usually Shift_JIS, sometimes UTF-8 and occasionally GBK or Big5. This
//! module turns bytes into text by trying an ordered list of candidate
//! encodings and keeping the first that decodes without error.
//!
//! ## Candidate Order
//! 1. The caller's override, if any.
//! 2. The locale's legacy codepage.
//! 3. UTF-8.
//! 4. The fallback codepage (Shift_JIS unless configured).
//!
//! Duplicates are dropped, keeping the first position. Every attempt is
//! recorded, so a failure can name all the encodings that were tried.
//!
//! ## Usage
//! ```rust
//! use ust::encoding::{candidates, resolve};
//! use ust::Settings;
//!
//! let order = candidates(None, &Settings::default());
//! let decoded = resolve("あ".as_bytes(), &order).unwrap();
//! assert_eq!(decoded.text, "あ");
//! assert_eq!(decoded.encoding.name(), "UTF-8");
//! ```

use encoding_rs::{Encoding, BIG5, EUC_JP, EUC_KR, GBK, SHIFT_JIS, UTF_8};
use log::debug;

use crate::error::UstError;
use crate::settings::Settings;

/// Text decoded by [`resolve`] and the encoding that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Outcome of decoding with one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Decoded(String),
    Malformed,
}

/// Look up an encoding by WHATWG label or Windows codepage name.
pub fn encoding_from_label(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    match label.to_ascii_lowercase().as_str() {
        "cp932" | "ms932" => Some(SHIFT_JIS),
        "cp936" | "ms936" => Some(GBK),
        "cp949" => Some(EUC_KR),
        "cp950" => Some(BIG5),
        "eucjp" => Some(EUC_JP),
        _ => Encoding::for_label(label.as_bytes()),
    }
}

/// Legacy codepage implied by a POSIX locale string such as `ja_JP.eucJP`.
///
/// An explicit codeset wins. Otherwise the language decides: Japanese maps
/// to Shift_JIS, traditional Chinese to Big5, other Chinese to GBK, Korean
/// to EUC-KR and everything else to UTF-8.
pub fn encoding_for_locale(locale: &str) -> &'static Encoding {
    let locale = locale.split('@').next().unwrap_or_default();
    let (name, codeset) = match locale.split_once('.') {
        Some((name, codeset)) => (name, Some(codeset)),
        None => (locale, None),
    };
    if let Some(encoding) = codeset.and_then(encoding_from_label) {
        return encoding;
    }
    let language = name.split('_').next().unwrap_or_default();
    match language {
        "ja" => SHIFT_JIS,
        "ko" => EUC_KR,
        "zh" if name.ends_with("_TW") || name.ends_with("_HK") => BIG5,
        "zh" => GBK,
        _ => UTF_8,
    }
}

/// Locale codepage from the first non-empty of `LC_ALL`, `LC_CTYPE`, `LANG`.
pub fn locale_encoding_from_env() -> &'static Encoding {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_default();
    encoding_for_locale(&locale)
}

/// Encoding declared by a `Charset=` line, if the bytes carry one.
pub fn declared_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .find_map(|line| line.strip_prefix(b"Charset="))
        .and_then(|label| std::str::from_utf8(label).ok())
        .and_then(encoding_from_label)
}

/// Ordered, duplicate-free candidate list.
pub fn candidates(
    override_encoding: Option<&'static Encoding>,
    settings: &Settings,
) -> Vec<&'static Encoding> {
    let ordered = [
        override_encoding,
        settings.locale_encoding,
        Some(UTF_8),
        Some(settings.fallback_encoding),
    ];
    let mut list: Vec<&'static Encoding> = Vec::with_capacity(ordered.len());
    for encoding in ordered.into_iter().flatten() {
        if !list.contains(&encoding) {
            list.push(encoding);
        }
    }
    list
}

/// Decode `bytes` strictly with one encoding. A UTF-8 byte order mark is
/// dropped.
pub fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Attempt {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
    } else {
        bytes
    };
    match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Attempt::Decoded(text.into_owned()),
        None => Attempt::Malformed,
    }
}

/// Try each candidate in order and return the first clean decode.
pub fn resolve(bytes: &[u8], candidates: &[&'static Encoding]) -> Result<Decoded, UstError> {
    let mut attempted = Vec::with_capacity(candidates.len());
    for &encoding in candidates {
        attempted.push(encoding.name().to_string());
        match decode_with(encoding, bytes) {
            Attempt::Decoded(text) => {
                debug!("decoded {} bytes as {}", bytes.len(), encoding.name());
                return Ok(Decoded { text, encoding });
            }
            Attempt::Malformed => debug!("{} rejected the input", encoding.name()),
        }
    }
    Err(UstError::DecodeError { attempted })
}

/// Decode project bytes: the settings override, else a `Charset=` line,
/// heads the candidate list.
pub fn resolve_with(bytes: &[u8], settings: &Settings) -> Result<Decoded, UstError> {
    let override_encoding = settings.encoding.or_else(|| declared_charset(bytes));
    resolve(bytes, &candidates(override_encoding, settings))
}

/// Encode `text`, failing on characters the encoding cannot represent.
pub fn encode(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, UstError> {
    let (bytes, used, had_errors) = encoding.encode(text);
    if had_errors || used != encoding {
        return Err(UstError::EncodeError {
            encoding: encoding.name().to_string(),
            message: "text contains characters the encoding cannot represent".to_string(),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order_and_dedup() {
        let settings = Settings {
            locale_encoding: Some(SHIFT_JIS),
            ..Settings::default()
        };
        assert_eq!(candidates(None, &settings), vec![SHIFT_JIS, UTF_8]);
        assert_eq!(
            candidates(Some(GBK), &settings),
            vec![GBK, SHIFT_JIS, UTF_8]
        );
        assert_eq!(
            candidates(None, &Settings::default()),
            vec![UTF_8, SHIFT_JIS]
        );
    }

    #[test]
    fn test_utf8_then_shift_jis() {
        let order = candidates(None, &Settings::default());

        let decoded = resolve("あいう".as_bytes(), &order).unwrap();
        assert_eq!(decoded.text, "あいう");
        assert_eq!(decoded.encoding, UTF_8);

        let (sjis, _, _) = SHIFT_JIS.encode("あいう");
        let decoded = resolve(&sjis, &order).unwrap();
        assert_eq!(decoded.text, "あいう");
        assert_eq!(decoded.encoding, SHIFT_JIS);
    }

    #[test]
    fn test_bom_is_stripped() {
        let decoded = resolve(b"\xEF\xBB\xBFabc", &[UTF_8]).unwrap();
        assert_eq!(decoded.text, "abc");
    }

    #[test]
    fn test_every_candidate_failing_names_them_all() {
        let err = resolve(&[0xff, 0xff, 0xff], &[UTF_8, SHIFT_JIS]).unwrap_err();
        match err {
            UstError::DecodeError { attempted } => {
                assert_eq!(attempted, vec!["UTF-8", "Shift_JIS"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_declared_charset() {
        assert_eq!(
            declared_charset(b"[#VERSION]\r\nUST Version1.2\r\nCharset=UTF-8\r\n"),
            Some(UTF_8)
        );
        assert_eq!(declared_charset(b"Charset=cp932\n"), Some(SHIFT_JIS));
        assert_eq!(declared_charset(b"[#SETTING]\nTempo=120\n"), None);
    }

    #[test]
    fn test_locale_mapping() {
        assert_eq!(encoding_for_locale("ja_JP.UTF-8"), UTF_8);
        assert_eq!(encoding_for_locale("ja_JP"), SHIFT_JIS);
        assert_eq!(encoding_for_locale("ja_JP.eucJP"), EUC_JP);
        assert_eq!(encoding_for_locale("zh_TW"), BIG5);
        assert_eq!(encoding_for_locale("zh_CN"), GBK);
        assert_eq!(encoding_for_locale("ko_KR"), EUC_KR);
        assert_eq!(encoding_for_locale("C"), UTF_8);
        assert_eq!(encoding_for_locale(""), UTF_8);
    }

    #[test]
    fn test_encode_rejects_unmappable_text() {
        assert!(encode("あ", SHIFT_JIS).is_ok());
        assert!(matches!(
            encode("한국어", SHIFT_JIS),
            Err(UstError::EncodeError { .. })
        ));
    }
}
