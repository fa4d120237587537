// 🔤 Text Normalizer - Canonical comparison form for address text
// Diacritic stripping + lowercasing + punctuation collapse

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free-form address text into its canonical comparison form.
///
/// Three guarantees:
/// 1. Vietnamese diacritics are removed: canonical decomposition (NFD)
///    followed by dropping all nonspacing combining marks. `đ`/`Đ` do not
///    decompose (they are distinct letters, not `d` + mark), so they are
///    mapped to `d` explicitly.
/// 2. ASCII lowercase.
/// 3. Punctuation other than commas becomes a space, whitespace runs
///    collapse to a single space, and the result is trimmed. Commas are
///    preserved because they delimit address components for the
///    component-wise similarity signal.
///
/// Empty input normalizes to the empty string; the function never fails
/// and is idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.nfd() {
        if is_combining_mark(ch) {
            continue;
        }

        let ch = match ch {
            'đ' | 'Đ' => 'd',
            c => c.to_ascii_lowercase(),
        };

        if ch == ',' {
            out.push(',');
        } else if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            // Whitespace and punctuation both collapse to one space
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        }
    }

    // Trailing separator from punctuation/whitespace at the end
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}

// ============================================================================
// TESTS
// ============================================================================
