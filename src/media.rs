use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// First year a motion picture could plausibly carry.
pub const EARLIEST_FILM_YEAR: i32 = 1888;

/// One unit of work: a movie identity plus its input container.
/// Built from configuration, validated at load time, never mutated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaItem {
    pub title: String,
    pub year: i32,
    pub path: PathBuf,
}

impl MediaItem {
    /// "Title (Year)", used for logging and output file naming.
    /// With `file_name_safe`, title characters outside `[a-zA-Z0-9-_ ]`
    /// are stripped before composing.
    pub fn fully_qualified_name(&self, file_name_safe: bool) -> String {
        let title = if file_name_safe {
            self.title
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
                .collect()
        } else {
            self.title.clone()
        };
        format!("{} ({})", title, self.year)
    }

    /// Everything wrong with this entry, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        self.problems_for_year(Local::now().year())
    }

    fn problems_for_year(&self, current_year: i32) -> Vec<String> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push(format!(
                "movie at {}: title must not be empty",
                self.path.display()
            ));
        }
        if self.year < EARLIEST_FILM_YEAR || self.year > current_year {
            problems.push(format!(
                "{}: year {} is outside {}..={}",
                self.title, self.year, EARLIEST_FILM_YEAR, current_year
            ));
        }
        if !self.path.is_file() {
            problems.push(format!("{}: input file not found", self.path.display()));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Local};
    use std::io::Write;

    fn item(title: &str, year: i32, path: PathBuf) -> MediaItem {
        MediaItem {
            title: title.into(),
            year,
            path,
        }
    }

    #[test]
    fn test_fully_qualified_name_plain() {
        let m = item("The Matrix", 1999, "ignored.mkv".into());
        assert_eq!(m.fully_qualified_name(false), "The Matrix (1999)");
        assert_eq!(m.fully_qualified_name(true), "The Matrix (1999)");
    }

    #[test]
    fn test_fully_qualified_name_strips_unsafe_characters() {
        let m = item("Mission: Impossible?!", 1996, "ignored.mkv".into());
        assert_eq!(m.fully_qualified_name(false), "Mission: Impossible?! (1996)");
        let safe = m.fully_qualified_name(true);
        assert_eq!(safe, "Mission Impossible (1996)");
        let title_part = safe.strip_suffix(" (1996)").unwrap();
        assert!(
            title_part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        );
    }

    #[test]
    fn test_year_bounds() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let current = Local::now().year();

        let too_early = item("Old", 1887, file.path().into());
        assert!(!too_early.problems_for_year(current).is_empty());

        let earliest = item("Roundhay Garden Scene", 1888, file.path().into());
        assert!(earliest.problems_for_year(current).is_empty());

        let this_year = item("New", current, file.path().into());
        assert!(this_year.problems_for_year(current).is_empty());

        let next_year = item("Future", current + 1, file.path().into());
        assert!(!next_year.problems_for_year(current).is_empty());
    }

    #[test]
    fn test_problems_are_collected_not_short_circuited() {
        let m = item("  ", 1700, "/no/such/file.mkv".into());
        assert_eq!(m.problems_for_year(2026).len(), 3);
    }

    #[test]
    fn test_valid_item_has_no_problems() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"mkv").unwrap();
        let m = item("The Matrix", 1999, file.path().into());
        assert!(m.problems_for_year(2026).is_empty());
    }
}
