// Command strings in the engine's command language

use crate::error::{MpvError, Result};

const FILE_SCHEME: &str = "file://";

/// `file://` URI for a local path; already-prefixed input is returned unchanged
pub fn file_uri(path: &str) -> String {
    if path.starts_with(FILE_SCHEME) {
        path.to_string()
    } else {
        format!("{}{}", FILE_SCHEME, path)
    }
}

/// Double-quote an argument using the engine's escapes (`\\`, `\"`).
/// Line breaks and NUL cannot be expressed in a command line and are rejected.
pub fn quote(arg: &str) -> Result<String> {
    if arg.contains(['\n', '\r', '\0']) {
        return Err(MpvError::InvalidInput(format!(
            "argument contains a line break or NUL: {:?}",
            arg
        )));
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for ch in arg.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    Ok(quoted)
}

/// `loadfile "<uri>"`, replacing the current playlist entry
pub fn loadfile(uri: &str) -> Result<String> {
    Ok(format!("loadfile {}", quote(uri)?))
}

/// `loadfile "<uri>" append`
pub fn append(uri: &str) -> Result<String> {
    Ok(format!("loadfile {} append", quote(uri)?))
}

/// `seek <position> absolute`
pub fn seek_absolute(position: f64) -> Result<String> {
    if !position.is_finite() {
        return Err(MpvError::InvalidInput(format!(
            "seek position must be finite, got {}",
            position
        )));
    }
    Ok(format!("seek {} absolute", position))
}

pub const PLAYLIST_NEXT: &str = "playlist-next";
pub const PLAYLIST_PREV: &str = "playlist-prev";
pub const PLAYLIST_CLEAR: &str = "playlist-clear";
pub const STOP: &str = "stop";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri() {
        assert_eq!(file_uri("/a/b.mp4"), "file:///a/b.mp4");
        assert_eq!(file_uri("file:///a/b.mp4"), "file:///a/b.mp4");
        assert_eq!(file_uri(&file_uri("/a/b.mp4")), "file:///a/b.mp4");
    }

    #[test]
    fn test_loadfile() {
        assert_eq!(
            loadfile("https://example.com/v.mkv").unwrap(),
            "loadfile \"https://example.com/v.mkv\""
        );
        assert_eq!(
            append("file:///a/b.mp4").unwrap(),
            "loadfile \"file:///a/b.mp4\" append"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"say "hi""#).unwrap(), r#""say \"hi\"""#);
        assert_eq!(quote(r"C:\media\a.mkv").unwrap(), r#""C:\\media\\a.mkv""#);
        assert!(matches!(quote("a\nb"), Err(MpvError::InvalidInput(_))));
        assert!(matches!(quote("a\0b"), Err(MpvError::InvalidInput(_))));
    }

    #[test]
    fn test_seek() {
        assert_eq!(seek_absolute(42.5).unwrap(), "seek 42.5 absolute");
        assert_eq!(seek_absolute(10.0).unwrap(), "seek 10 absolute");
        assert!(seek_absolute(f64::NAN).is_err());
        assert!(seek_absolute(f64::INFINITY).is_err());
    }
}
