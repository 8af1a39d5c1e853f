use std::path::Path;

/// Expand a leading `~` or `~/` against `home`.
///
/// `~user` forms and paths without a leading tilde are returned unchanged, as
/// is everything when no home directory is known.
pub fn expand_home(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };

    if path == "~" {
        return home.display().to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).display().to_string(),
        None => path.to_string(),
    }
}
