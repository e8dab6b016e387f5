//! Best-effort text decoding with statistical encoding detection

use chardetng::EncodingDetector;
use encoding_rs::UTF_8;

/// Outcome of a best-effort decode
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// Decoded text
    pub text: String,
    /// Name of the encoding that produced it
    pub encoding: &'static str,
    /// True when replacement characters were substituted
    pub lossy: bool,
}

/// Decode bytes using a statistical encoding guess, falling back to UTF-8
/// with lossy substitution. Never fails: malformed sequences degrade to a
/// flagged lossy decode instead.
pub fn decode_best_effort(bytes: &[u8]) -> DecodedText {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);

    let (text, had_errors) = {
        let (cow, _, had_errors) = guessed.decode(bytes);
        (cow.into_owned(), had_errors)
    };

    if !had_errors {
        return DecodedText {
            text,
            encoding: guessed.name(),
            lossy: false,
        };
    }

    let (utf8_text, _, utf8_errors) = UTF_8.decode(bytes);
    if !utf8_errors {
        return DecodedText {
            text: utf8_text.into_owned(),
            encoding: UTF_8.name(),
            lossy: false,
        };
    }

    DecodedText {
        text,
        encoding: guessed.name(),
        lossy: true,
    }
}
