// Parser for the `yt-dlp -F` format table
//
// The table is meant for humans: columns shift between rows (audio rows print
// "audio only" across two columns) and between yt-dlp versions. Parsing is
// positional for the first four columns and substring-based for size and codec.

use super::errors::DownloadError;
use super::models::{FormatDescriptor, NOT_AVAILABLE};

/// Printed by yt-dlp right before the table
pub const LISTING_MARKER: &str = "Available formats for";

const SIZE_UNITS: [&str; 3] = ["GiB", "MiB", "KiB"];
const VIDEO_CODECS: [&str; 3] = ["avc1", "vp09", "av01"];

/// Parse the complete stdout of a listing run.
pub fn parse_format_listing(output: &str) -> Result<Vec<FormatDescriptor>, DownloadError> {
    if !output.contains(LISTING_MARKER) {
        return Err(DownloadError::ParseFailure(
            "No format information found".to_string(),
        ));
    }

    Ok(output
        .lines()
        .map(str::trim)
        .filter(|line| is_format_row(line))
        .map(parse_format_row)
        .collect())
}

fn is_format_row(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('[') && !line.starts_with("ID") && !line.starts_with("--")
}

fn parse_format_row(line: &str) -> FormatDescriptor {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let column = |idx: usize| parts.get(idx).copied().unwrap_or(NOT_AVAILABLE).to_string();

    let resolution = match parts.get(2) {
        Some(&"audio") => "audio only".to_string(),
        _ => column(2),
    };
    // "audio only" pushes "only" into the fps column
    let frame_rate = match parts.get(3) {
        Some(&"only") => NOT_AVAILABLE.to_string(),
        _ => column(3),
    };

    let file_size = parts
        .iter()
        .find(|p| is_size_token(p))
        .map(|p| p.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let video_codec = parts
        .iter()
        .find(|p| VIDEO_CODECS.iter().any(|c| p.contains(c)))
        .map(|p| p.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    FormatDescriptor {
        id: column(0),
        container: column(1),
        resolution,
        frame_rate,
        file_size,
        video_codec,
        raw_line: line.to_string(),
    }
}

/// "2.95MiB", "~1.20GiB", "≈850KiB" and plain byte counts like "512B"
fn is_size_token(token: &str) -> bool {
    if SIZE_UNITS.iter().any(|u| token.contains(u)) {
        return true;
    }
    token
        .strip_suffix('B')
        .map(|n| n.trim_start_matches(['~', '≈']))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
[youtube] Extracting URL: https://www.youtube.com/watch?v=6KL2QZ91kAM
[youtube] 6KL2QZ91kAM: Downloading webpage
[info] Available formats for 6KL2QZ91kAM:
ID  EXT   RESOLUTION FPS CH |   FILESIZE   TBR PROTO | VCODEC          VBR ACODEC      ABR ASR MORE INFO
---------------------------------------------------------------------------------------------------------------
sb0 mhtml 48x27        0    |                  mhtml | images                                  storyboard
139 m4a   audio only      2 |    1.06MiB   49k https | audio only          mp4a.40.5   49k 22k low, m4a_dash
140 m4a   audio only      2 |    2.95MiB  130k https | audio only          mp4a.40.2  130k 44k medium, m4a_dash
160 mp4   256x144     30    |    1.40MiB   62k https | avc1.4d400c     62k video only          144p, mp4_dash
137 mp4   1920x1080   30    | ~ 48.61MiB 2150k https | avc1.640028   2150k video only          1080p, mp4_dash
248 webm  1920x1080   30    |   40.10MiB 1774k https | vp09.00.40.08 1774k video only          1080p, webm_dash
399 mp4   1920x1080   30    |   30.52MiB 1350k https | av01.0.08M.08 1350k video only          1080p, mp4_dash
";

    #[test]
    fn test_rows_in_order() {
        let formats = parse_format_listing(LISTING).unwrap();
        let ids: Vec<&str> = formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["sb0", "139", "140", "160", "137", "248", "399"]);
    }

    #[test]
    fn test_audio_row() {
        let formats = parse_format_listing(LISTING).unwrap();
        let audio = &formats[2];
        assert_eq!(audio.container, "m4a");
        assert_eq!(audio.resolution, "audio only");
        assert_eq!(audio.frame_rate, "N/A");
        assert_eq!(audio.file_size, "2.95MiB");
        assert_eq!(audio.video_codec, "N/A");
        assert!(audio.is_audio_only());
    }

    #[test]
    fn test_video_rows() {
        let formats = parse_format_listing(LISTING).unwrap();

        let cases = [
            ("160", "256x144", "30", "1.40MiB", "avc1.4d400c"),
            ("137", "1920x1080", "30", "48.61MiB", "avc1.640028"),
            ("248", "1920x1080", "30", "40.10MiB", "vp09.00.40.08"),
            ("399", "1920x1080", "30", "30.52MiB", "av01.0.08M.08"),
        ];
        for (id, res, fps, size, codec) in cases {
            let f = formats.iter().find(|f| f.id == id).unwrap();
            assert_eq!(f.container, if id == "248" { "webm" } else { "mp4" }, "{}", id);
            assert_eq!(f.resolution, res, "{}", id);
            assert_eq!(f.frame_rate, fps, "{}", id);
            assert_eq!(f.file_size, size, "{}", id);
            assert_eq!(f.video_codec, codec, "{}", id);
        }
    }

    #[test]
    fn test_storyboard_row_falls_back() {
        let formats = parse_format_listing(LISTING).unwrap();
        let sb = &formats[0];
        assert_eq!(sb.resolution, "48x27");
        assert_eq!(sb.file_size, "N/A");
        assert_eq!(sb.video_codec, "N/A");
    }

    #[test]
    fn test_compact_audio_line() {
        let output = format!(
            "{} xyz:\n140 m4a audio only tiny 2.95MiB https avc1 2.00\n",
            LISTING_MARKER
        );
        let formats = parse_format_listing(&output).unwrap();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].resolution, "audio only");
        assert_eq!(formats[0].frame_rate, "N/A");
        assert_eq!(formats[0].file_size, "2.95MiB");
        assert_eq!(formats[0].video_codec, "avc1");
        assert_eq!(
            formats[0].raw_line,
            "140 m4a audio only tiny 2.95MiB https avc1 2.00"
        );
    }

    #[test]
    fn test_short_row_never_panics() {
        let output = format!("{} xyz:\n   18   \n", LISTING_MARKER);
        let formats = parse_format_listing(&output).unwrap();
        assert_eq!(formats.len(), 1);
        let f = &formats[0];
        assert_eq!(f.id, "18");
        assert_eq!(f.container, "N/A");
        assert_eq!(f.resolution, "N/A");
        assert_eq!(f.frame_rate, "N/A");
        assert_eq!(f.file_size, "N/A");
        assert_eq!(f.video_codec, "N/A");
    }

    #[test]
    fn test_missing_marker() {
        let outputs = [
            "",
            "ID EXT RESOLUTION\n140 m4a audio only 2.95MiB\n",
            "[youtube] abc: Downloading webpage\n",
        ];
        for output in outputs {
            let err = parse_format_listing(output).unwrap_err();
            assert_eq!(err.to_string(), "No format information found");
        }
    }

    #[test]
    fn test_marker_without_rows() {
        let output = format!("[info] {} abc:\nID EXT\n-----\n\n", LISTING_MARKER);
        assert!(parse_format_listing(&output).unwrap().is_empty());
    }

    #[test]
    fn test_size_tokens() {
        for token in ["2.95MiB", "~1.20GiB", "850KiB", "512B", "~512B"] {
            assert!(is_size_token(token), "{}", token);
        }
        for token in ["https", "m4a_dash", "B", "mp4a.40.2", "130k"] {
            assert!(!is_size_token(token), "{}", token);
        }
    }
}
