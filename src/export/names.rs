//! Entry name normalization.
//!
//! Archive entry names must be usable on every platform the archive may be
//! unpacked on, so [`sanitize`] turns arbitrary caller-supplied names into
//! forward-slash separated relative paths without reserved characters.

use std::collections::HashSet;

/// Substituted when nothing usable is left of a name.
pub const DEFAULT_NAME: &str = "untitled";

/// Longest sanitized name, in UTF-8 bytes.
pub const MAX_NAME_BYTES: usize = 240;

/// Longest suffix still treated as an extension when truncating.
const MAX_EXTENSION_BYTES: usize = 16;

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*'];

/// Normalize `raw` into a safe archive entry name.
///
/// Backslashes become `/`, control and reserved characters are dropped,
/// overlong names lose the end of their stem but keep their extension, and
/// every path segment is trimmed of surrounding whitespace and dots (which
/// also drops empty, `.` and `..` segments). Idempotent; never empty.
pub fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .filter(|c| !c.is_control() && !FORBIDDEN.contains(c))
        .collect();

    let truncated = truncate_stem(&cleaned, MAX_NAME_BYTES);
    let trimmed = trim_segments(&truncated);

    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed
    }
}

/// Sanitize an archive file name and make sure it ends in `.zip`.
pub fn archive_file_name(raw: &str) -> String {
    let name = sanitize(raw).replace('/', "_");
    if name.to_ascii_lowercase().ends_with(".zip") {
        name
    } else {
        format!("{name}.zip")
    }
}

/// Split `name` into stem and extension (with its dot). Dot files have no extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    let segment_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[segment_start..].rfind('.') {
        Some(dot) if dot > 0 && name.len() - (segment_start + dot) <= MAX_EXTENSION_BYTES => {
            name.split_at(segment_start + dot)
        }
        _ => (name, ""),
    }
}

fn truncate_stem(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    let mut cut = (max - ext.len()).min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], ext)
}

fn trim_segments(name: &str) -> String {
    name.split('/')
        .map(|segment| segment.trim_matches(|c: char| c.is_whitespace() || c == '.'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hands out names that have not been used yet in one archive.
///
/// A repeated name gets ` (2)`, ` (3)` ... inserted before its extension.
/// Names are compared ignoring case, so `A.png` and `a.png` never land side by
/// side on a case-insensitive file system.
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    pub fn claim(&mut self, name: String) -> String {
        if self.seen.insert(name.to_lowercase()) {
            return name;
        }

        let (stem, ext) = split_extension(&name);
        let mut n = 2;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.seen.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replaces_backslashes_and_strips_reserved() {
        let name = sanitize("my\\file:name?.png");
        assert_eq!(name, "my/filename.png");
        assert!(!name.contains(['\\', ':', '?']));
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(sanitize("a\u{0}b\tc\n.txt"), "abc.txt");
        assert_eq!(sanitize("<>|\"*x"), "x");
    }

    #[test]
    fn trims_whitespace_dots_and_empty_segments() {
        assert_eq!(sanitize("  ..report.txt.  "), "report.txt");
        assert_eq!(sanitize("/abs//path/./x"), "abs/path/x");
        assert_eq!(sanitize("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize(" /a"), "a");
    }

    #[test]
    fn empty_results_use_default_name() {
        assert_eq!(sanitize(""), DEFAULT_NAME);
        assert_eq!(sanitize("  ...  "), DEFAULT_NAME);
        assert_eq!(sanitize("???"), DEFAULT_NAME);
    }

    #[test]
    fn long_names_keep_their_extension() {
        let name = sanitize(&format!("{}.png", "a".repeat(400)));
        assert_eq!(name.len(), MAX_NAME_BYTES);
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let name = sanitize(&format!("{}.txt", "é".repeat(200)));
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "",
            "plain.txt",
            "my\\file:name?.png",
            " /a",
            "dir/ ./b",
            "x/.",
            ".hidden",
            "..",
            "a.b.c",
            "\u{7f}ctl",
        ];
        let long = format!("dir/{}.frame.png", "z".repeat(300));
        let long_dir = format!("{}/.png", "d".repeat(300));
        for raw in samples.iter().copied().chain([long.as_str(), long_dir.as_str()]) {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once, "not idempotent for {raw:?}");
            assert!(!once.is_empty());
        }
    }

    #[test]
    fn archive_names_get_zip_extension() {
        assert_eq!(archive_file_name("out.zip"), "out.zip");
        assert_eq!(archive_file_name("OUT.ZIP"), "OUT.ZIP");
        assert_eq!(archive_file_name("frames"), "frames.zip");
        assert_eq!(archive_file_name("a/b"), "a_b.zip");
        assert_eq!(archive_file_name(""), "untitled.zip");
    }

    #[test]
    fn duplicate_names_are_numbered() {
        let mut names = UniqueNames::default();
        assert_eq!(names.claim("a.png".into()), "a.png");
        assert_eq!(names.claim("a.png".into()), "a (2).png");
        assert_eq!(names.claim("a.png".into()), "a (3).png");
        assert_eq!(names.claim("notes".into()), "notes");
        assert_eq!(names.claim("notes".into()), "notes (2)");
    }

    #[test]
    fn duplicate_check_ignores_case() {
        let mut names = UniqueNames::default();
        assert_eq!(names.claim("A.png".into()), "A.png");
        assert_eq!(names.claim("a.png".into()), "a (2).png");
        assert_eq!(names.claim("A (2).PNG".into()), "A (2) (2).PNG");
        assert_eq!(names.claim("Dir/Info.txt".into()), "Dir/Info.txt");
        assert_eq!(names.claim("dir/info.TXT".into()), "dir/info (2).TXT");
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("dir.v2/file"), ("dir.v2/file", ""));
        assert_eq!(split_extension("dir/file.tar"), ("dir/file", ".tar"));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
