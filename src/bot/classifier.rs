use log::debug;

/// Case-insensitive substring match of `text` against `keywords`.
///
/// Keywords are expected to be lower-case already. There is no word-boundary
/// handling: "sue" matches inside "issue".
pub fn is_in_domain<S: AsRef<str>>(keywords: &[S], text: &str) -> bool {
    let lowered = text.to_lowercase();
    let hit = keywords.iter().find(|k| lowered.contains(k.as_ref()));
    if let Some(keyword) = hit {
        debug!("Classifier matched keyword '{}'", keyword.as_ref());
    }
    hit.is_some()
}
