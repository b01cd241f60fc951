use crate::error::AppError;

/// Names generated for a newly uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNames {
    /// Sanitized client filename, used as the initial display name.
    pub display: String,
    /// Video file name under the samples directory.
    pub stored_as: String,
    /// Thumbnail file name under the thumbnails directory.
    pub thumbnail: String,
}

/// Reduce a client-supplied filename to a safe flat ASCII name.
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing `.`/`_` are stripped. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Split off the last extension; a leading dot does not start one.
fn split_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    }
}

/// Derive display, stored and thumbnail names for an upload.
///
/// `token` must be unique per upload; it is appended to the stem so that
/// repeated uploads of the same file never collide on disk.
pub fn stored_names(original: &str, token: &str, max_stem_len: usize) -> Result<StoredNames, AppError> {
    let display = sanitize_filename(original);
    if display.is_empty() {
        return Err(AppError::Validation(
            "Filename contains no usable characters".into(),
        ));
    }

    let stem = split_stem(&display);
    if stem.len() >= max_stem_len {
        return Err(AppError::Validation(format!(
            "Filename must not exceed {max_stem_len} bytes"
        )));
    }

    let base: String = format!("{stem}_{token}")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '.' | '-'))
        .collect();

    Ok(StoredNames {
        stored_as: format!("{base}.mp4"),
        thumbnail: format!("{base}.png"),
        display,
    })
}

/// A fresh 20-character hex token.
pub fn upload_token() -> String {
    let bytes: [u8; 10] = rand::random();
    hex::encode(bytes)
}

/// Normalize a user-edited display name: a trailing `.mp4` is dropped, word
/// characters and whitespace are kept, whitespace runs become `_`, and `.mp4`
/// is appended.
pub fn normalize_display_name(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    let without_ext = match trimmed.len().checked_sub(4) {
        Some(cut) if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".mp4") => {
            &trimmed[..cut]
        }
        _ => trimmed,
    };

    let kept: String = without_ext
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    let name = kept.split_whitespace().collect::<Vec<_>>().join("_");

    if name.is_empty() {
        return Err(AppError::Validation("Filename must not be empty".into()));
    }
    Ok(format!("{name}.mp4"))
}
