use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Strip diacritics, lower-case and trim.
///
/// Decomposes to NFKD and drops combining marks, so `"São Paulo"` becomes
/// `"sao paulo"`. Running it twice yields the same string.
pub fn normalize(text: &str) -> String {
    let stripped: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.to_lowercase().trim().to_string()
}
