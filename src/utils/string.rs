pub fn unquote_string(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\''))
            || (s.starts_with('`') && s.ends_with('`')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Default package name for an import path without an alias.
///
/// Go module major-version suffixes (`/v2`) and gopkg.in style suffixes
/// (`yaml.v3`) are not part of the package name.
pub fn package_name_from_path(import_path: &str) -> String {
    let mut segments = import_path.rsplit('/');
    let last = segments.next().unwrap_or(import_path);

    let is_major_version =
        last.len() > 1 && last.starts_with('v') && last[1..].chars().all(|c| c.is_ascii_digit());
    let name = if is_major_version {
        segments.next().unwrap_or(last)
    } else {
        last
    };

    match name.split_once(".v") {
        Some((base, version))
            if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) =>
        {
            base.to_string()
        }
        _ => name.to_string(),
    }
}
