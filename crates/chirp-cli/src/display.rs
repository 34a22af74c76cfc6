use std::fmt::Write;

use chirp_types::models::{Chirp, ChirpId};
use chrono::{DateTime, Local, Utc};

const PADDING: char = '|';
pub const SEPARATOR: &str = "--------------------------";

/// Coarse relative age: days past 24 hours, then hours, minutes, seconds.
pub fn age(now: DateTime<Utc>, created_at: DateTime<Utc>) -> String {
    let diff = now - created_at;
    let hours = diff.num_hours();
    if hours > 24 {
        format!("{} day(s) ago", hours / 24)
    } else if hours > 0 {
        format!("{} hour(s) ago", hours)
    } else if diff.num_minutes() > 0 {
        format!("{} min(s) ago", diff.num_minutes())
    } else {
        format!("{} sec(s) ago", diff.num_seconds().max(0))
    }
}

/// One chirp, every line prefixed with `depth` padding characters.
pub fn render_chirp(chirp: &Chirp, depth: usize, now: DateTime<Utc>) -> String {
    let prefix: String = std::iter::repeat_n(PADDING, depth).collect();
    let local = chirp.created_at.with_timezone(&Local);

    let mut out = String::new();
    let _ = writeln!(out, "{}ID: {}", prefix, chirp.id);
    let _ = writeln!(
        out,
        "{}@{} \u{00B7} {} ({})",
        prefix,
        chirp.username,
        age(now, chirp.created_at),
        local.format("%F %T")
    );
    if chirp.is_reply() {
        let _ = writeln!(out, "{}Reply: {}", prefix, chirp.parent_id);
    }
    let _ = writeln!(out, "{}{}", prefix, chirp.text);
    out
}

/// A pre-order thread, indented by reply depth. A chirp whose parent is not
/// on the current path (e.g. the parent was deleted) starts again at depth 0.
pub fn render_thread(chirps: &[Chirp], now: DateTime<Utc>) -> String {
    let mut path: Vec<ChirpId> = Vec::new();
    let mut out = String::new();
    let _ = writeln!(out, "{}", SEPARATOR);

    for chirp in chirps {
        while path.last().is_some_and(|&top| top != chirp.parent_id) {
            path.pop();
        }
        out.push_str(&render_chirp(chirp, path.len(), now));
        let _ = writeln!(out, "{}", SEPARATOR);
        path.push(chirp.id);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn chirp(id: ChirpId, parent_id: ChirpId, created_at: DateTime<Utc>) -> Chirp {
        Chirp {
            id,
            username: "bob".into(),
            text: format!("text {}", id),
            created_at,
            parent_id,
        }
    }

    #[test]
    fn age_buckets() {
        let now = Utc::now();
        assert_eq!(age(now, now - Duration::seconds(5)), "5 sec(s) ago");
        assert_eq!(age(now, now - Duration::seconds(125)), "2 min(s) ago");
        assert_eq!(age(now, now - Duration::hours(3)), "3 hour(s) ago");
        assert_eq!(age(now, now - Duration::hours(24)), "24 hour(s) ago");
        assert_eq!(age(now, now - Duration::hours(50)), "2 day(s) ago");
        assert_eq!(age(now, now + Duration::seconds(3)), "0 sec(s) ago");
    }

    #[test]
    fn replies_show_their_parent() {
        let now = Utc::now();
        let root = render_chirp(&chirp(1, 0, now), 0, now);
        assert!(root.starts_with("ID: 1\n@bob \u{00B7} 0 sec(s) ago ("));
        assert!(!root.contains("Reply:"));

        let reply = render_chirp(&chirp(2, 1, now), 2, now);
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines[0], "||ID: 2");
        assert_eq!(lines[2], "||Reply: 1");
        assert_eq!(lines[3], "||text 2");
    }

    #[test]
    fn thread_depth_follows_the_reply_path() {
        let now = Utc::now();
        // 1 -> (2 -> 4), 3; 6's parent 5 is not in the output.
        let thread = [
            chirp(1, 0, now),
            chirp(2, 1, now),
            chirp(4, 2, now),
            chirp(3, 1, now),
            chirp(6, 5, now),
        ];

        let rendered = render_thread(&thread, now);
        let ids: Vec<&str> = rendered
            .lines()
            .filter(|line| line.trim_start_matches('|').starts_with("ID:"))
            .collect();
        assert_eq!(ids, ["ID: 1", "|ID: 2", "||ID: 4", "|ID: 3", "ID: 6"]);
    }
}
