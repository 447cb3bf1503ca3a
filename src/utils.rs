use std::{fmt, path::Path};

use lazy_regex::{Lazy, Regex, lazy_regex};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tokio::{fs, io};

/// Longest file stem we hand to the filesystem, in characters
const MAX_FILENAME_CHARS: usize = 120;

static YOUTUBE_LINK: Lazy<Regex> = lazy_regex!(
    r"^(https?://)?(www\.|m\.|music\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|shorts/|live/|.+\?v=)?([^&=%\?]{11})"
);

/// Why a message was not accepted as a video link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRejection {
    Empty,
    NotAVideoLink,
}

impl fmt::Display for LinkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRejection::Empty => write!(f, "⚠️ Please send me a YouTube link."),
            LinkRejection::NotAVideoLink => write!(
                f,
                "⚠️ This doesn't look like a valid YouTube link. Please try again."
            ),
        }
    }
}

/// Pattern check for a supported video link. Advisory only: the fetcher may
/// still refuse a link that passes.
pub fn validate_link(text: &str) -> Result<&str, LinkRejection> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LinkRejection::Empty);
    }
    if YOUTUBE_LINK.is_match(text) {
        Ok(text)
    } else {
        Err(LinkRejection::NotAVideoLink)
    }
}

/// Strips characters that are illegal in file names on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();

    cleaned
        .trim()
        .trim_start_matches('.')
        .trim()
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Naming options offered after a link is accepted
#[derive(EnumIter, Display, EnumString, AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameChoice {
    #[strum(serialize = "keep_original")]
    KeepOriginal,
    #[strum(serialize = "rename_file")]
    Rename,
}

impl RenameChoice {
    pub fn label(&self) -> &'static str {
        match self {
            RenameChoice::KeepOriginal => "✅ Keep Original Title",
            RenameChoice::Rename => "✏️ Rename File",
        }
    }
}

/// Removes everything inside `dir`, keeping the directory itself
pub async fn clear_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let mut entries = match fs::read_dir(dir.as_ref()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn accepts_known_link_shapes() {
        for link in [
            "https://www.youtube.com/watch?v=abc12345678",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=share",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD",
            "https://www.youtube.com/attribution_link?a=x&u=/watch?v=dQw4w9WgXcQ",
            "  https://youtu.be/dQw4w9WgXcQ  ",
        ] {
            assert!(validate_link(link).is_ok(), "should accept {link}");
        }
    }

    #[test]
    fn rejects_other_text() {
        for text in [
            "not a link",
            "https://vimeo.com/123456789",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/short",
            "check this https://youtu.be/dQw4w9WgXcQ",
        ] {
            assert_eq!(validate_link(text), Err(LinkRejection::NotAVideoLink), "{text}");
        }
    }

    #[test]
    fn empty_text_has_its_own_reason() {
        assert_eq!(validate_link(""), Err(LinkRejection::Empty));
        assert_eq!(validate_link(" \n\t "), Err(LinkRejection::Empty));
    }

    #[test]
    fn validated_link_is_trimmed() {
        assert_eq!(
            validate_link(" https://youtu.be/dQw4w9WgXcQ\n"),
            Ok("https://youtu.be/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn sanitize_removes_illegal_characters() {
        assert_eq!(sanitize_filename("My:Track*"), "MyTrack");
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
        assert_eq!(sanitize_filename("  spaced name  "), "spaced name");
        assert_eq!(sanitize_filename("tab\tname"), "tabname");
        assert_eq!(sanitize_filename("..hidden"), "hidden");
    }

    #[test]
    fn sanitize_keeps_permitted_characters() {
        let illegal = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];
        for input in ["x", "?x?", "<<Песня>>", "a|b", "***1"] {
            let out = sanitize_filename(input);
            assert!(!out.is_empty(), "{input}");
            assert!(!out.chars().any(|c| illegal.contains(&c)), "{input}");
        }
    }

    #[test]
    fn sanitize_can_end_up_empty() {
        assert_eq!(sanitize_filename(r#"\/*?:"<>|"#), "");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn rename_choice_callback_data_round_trips() {
        for choice in RenameChoice::iter() {
            assert_eq!(RenameChoice::from_str(choice.as_ref()).unwrap(), choice);
        }
        assert_eq!(RenameChoice::KeepOriginal.to_string(), "keep_original");
        assert!(RenameChoice::from_str("something_else").is_err());
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
    }

    #[tokio::test]
    async fn clear_dir_removes_contents_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("job")).unwrap();
        std::fs::write(dir.path().join("job").join("b.part"), b"x").unwrap();

        clear_dir(dir.path()).await.unwrap();

        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        clear_dir(dir.path().join("missing")).await.unwrap();
    }
}
