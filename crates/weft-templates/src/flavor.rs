//! Escaping flavor selection by file name.

use std::path::MAIN_SEPARATOR;

use minijinja::AutoEscape;

/// Second extension that marks a template as plain text.
pub const TEXT_MARKER: &str = ".txt";

/// Escaping discipline applied when rendering a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Plain text, no escaping.
    Text,
    /// HTML-escaped output.
    Html,
}

impl Flavor {
    /// Pick the flavor for a template name or path.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if ext2(name) == TEXT_MARKER {
            Self::Text
        } else {
            Self::Html
        }
    }

    pub(crate) fn auto_escape(self) -> AutoEscape {
        match self {
            Self::Text => AutoEscape::None,
            Self::Html => AutoEscape::Html,
        }
    }
}

/// Return the second-to-last extension of the final path segment.
///
/// The result includes the leading dot. Dots in directory segments never
/// count, and a final segment with fewer than two dots yields `""`.
///
/// ```
/// use weft_templates::ext2;
///
/// assert_eq!(ext2("mail.txt.tmpl"), ".txt");
/// assert_eq!(ext2("page.html"), "");
/// ```
#[must_use]
pub fn ext2(path: &str) -> &str {
    let name = path
        .rsplit(|c| c == '/' || c == MAIN_SEPARATOR)
        .next()
        .unwrap_or(path);
    let Some(last) = name.rfind('.') else {
        return "";
    };
    let Some(prev) = name[..last].rfind('.') else {
        return "";
    };
    &name[prev..last]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext2() {
        let cases = [
            ("filename.a", ""),
            ("filename.a.b", ".a"),
            ("filename.a.b.c", ".b"),
            ("/dir.a/file.b", ""),
            ("filename", ""),
            ("", ""),
            ("templates/mail.txt.tmpl", ".txt"),
        ];
        for (input, expected) in cases {
            assert_eq!(ext2(input), expected, "ext2({input:?})");
        }
    }

    #[test]
    fn test_flavor_of() {
        assert_eq!(Flavor::of("welcome.txt.tmpl"), Flavor::Text);
        assert_eq!(Flavor::of("dir/welcome.txt.j2"), Flavor::Text);
        assert_eq!(Flavor::of("page.html"), Flavor::Html);
        assert_eq!(Flavor::of("page.html.tmpl"), Flavor::Html);
        assert_eq!(Flavor::of("notes.txt"), Flavor::Html);
        assert_eq!(Flavor::of("dir.txt.d/page"), Flavor::Html);
    }
}
