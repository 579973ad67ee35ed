//! Filesystem-safe names for downloaded titles

/// Characters rejected by at least one of Windows, macOS or Linux
const INVALID_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

const MAX_LEN: usize = 200;

/// Windows refuses these as file stems regardless of extension
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turn an arbitrary media title into a name that is safe to use as a file stem.
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized: String = title
        .replace("..", "")
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    sanitized = sanitized.trim().trim_start_matches('.').to_string();
    sanitized = sanitized.trim_end_matches('.').trim_end().to_string();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&sanitized))
    {
        sanitized.insert(0, '_');
    }

    if sanitized.is_empty() {
        return "untitled".to_string();
    }

    if sanitized.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
    }

    sanitized
}
