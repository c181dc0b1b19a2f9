// Progress line parsing for `yt-dlp` download output
//
// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
// [download]  45.2% of ~10.00MiB at 512.00KiB/s ETA 00:10
// [download] 100% of   10.00MiB in 00:00:20 at 512.00KiB/s

use regex::Regex;

use super::models::{FragmentCounter, ProgressSample};

lazy_static::lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*)(GiB|MiB|KiB|B)(?:\s+at\s+(\d+\.?\d*)(GiB|MiB|KiB|B)/s)?(?:\s+ETA\s+(\d+(?::\d+)+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
}

/// Parse one stdout line; `None` for anything that is not a progress line.
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let caps = PROGRESS_RE.captures(line)?;

    let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
    let size = format!("{}{}", caps.get(2)?.as_str(), caps.get(3)?.as_str());
    let speed = match (caps.get(4), caps.get(5)) {
        (Some(value), Some(unit)) => Some(format!("{}{}/s", value.as_str(), unit.as_str())),
        _ => None,
    };
    let eta = caps.get(6).map(|m| m.as_str().to_string());
    let fragments = match (caps.get(7), caps.get(8)) {
        (Some(current), Some(total)) => Some(FragmentCounter {
            current: current.as_str().parse().ok()?,
            total: total.as_str().parse().ok()?,
        }),
        _ => None,
    };

    Some(ProgressSample {
        percent: percent.clamp(0.0, 100.0),
        size,
        speed,
        eta,
        fragments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_line() {
        let sample =
            parse_progress_line("[download]  45.2% of ~10.00MiB at 512.00KiB/s ETA 00:10").unwrap();
        assert_eq!(
            sample,
            ProgressSample {
                percent: 45.2,
                size: "10.00MiB".to_string(),
                speed: Some("512.00KiB/s".to_string()),
                eta: Some("00:10".to_string()),
                fragments: None,
            }
        );
    }

    #[test]
    fn test_fragmented_stream() {
        let sample = parse_progress_line(
            "[download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)",
        )
        .unwrap();
        assert_eq!(sample.percent, 6.2);
        assert_eq!(sample.size, "343.72MiB");
        assert_eq!(sample.speed.as_deref(), Some("420.30KiB/s"));
        assert_eq!(sample.eta.as_deref(), Some("12:32"));
        assert_eq!(sample.fragments, Some(FragmentCounter { current: 29, total: 454 }));
    }

    #[test]
    fn test_optional_groups_absent() {
        let cases = [
            ("[download]   0.0% of 10.00MiB", None, None),
            ("[download]   0.0% of 10.00MiB at Unknown B/s ETA Unknown", None, None),
            ("[download]  12.0% of 1.50GiB at 2.00MiB/s ETA Unknown", Some("2.00MiB/s"), None),
            ("[download]  99.9% of 700B ETA 00:00", None, Some("00:00")),
        ];
        for (line, speed, eta) in cases {
            let sample = parse_progress_line(line).unwrap();
            assert_eq!(sample.speed.as_deref(), speed, "{}", line);
            assert_eq!(sample.eta.as_deref(), eta, "{}", line);
        }
    }

    #[test]
    fn test_long_eta_and_completion_line() {
        let sample =
            parse_progress_line("[download]   1.0% of 4.00GiB at 1.00MiB/s ETA 01:07:59").unwrap();
        assert_eq!(sample.eta.as_deref(), Some("01:07:59"));

        let done = parse_progress_line("[download] 100% of   10.00MiB in 00:00:20 at 512.00KiB/s")
            .unwrap();
        assert_eq!(done.percent, 100.0);
        assert_eq!(done.size, "10.00MiB");
        assert_eq!(done.speed, None);
    }

    #[test]
    fn test_percent_bounds() {
        for line in [
            "[download]   0% of 1.00MiB",
            "[download]  50.5% of 1.00MiB",
            "[download] 100.0% of 1.00MiB",
            "[download] 100.7% of 1.00MiB",
        ] {
            let sample = parse_progress_line(line).unwrap();
            assert!((0.0..=100.0).contains(&sample.percent), "{}", line);
        }
    }

    #[test]
    fn test_non_progress_lines() {
        for line in [
            "",
            "[youtube] 6KL2QZ91kAM: Downloading webpage",
            "[download] Destination: /tmp/My Video.f137.mp4",
            "[download] /tmp/My Video.mp4 has already been downloaded",
            "[Merger] Merging formats into \"/tmp/My Video.mp4\"",
            "Deleting original file /tmp/My Video.f140.m4a (pass -k to keep)",
        ] {
            assert!(parse_progress_line(line).is_none(), "{}", line);
        }
    }
}
