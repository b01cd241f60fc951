use std::path::MAIN_SEPARATOR;

/// Replace every whitespace-separated word that contains a path separator
/// with `<stripped>`, so error text never reveals filesystem layout.
pub fn sanitize_error(msg: &str) -> String {
    msg.split(' ')
        .map(|word| {
            if word.contains(MAIN_SEPARATOR) || word.contains('/') {
                "<stripped>"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
