//! Page controllers: one value per open dashboard, holding the signed-in
//! user and driving the CRUD modules underneath.

pub mod hrd;
pub mod pelamar;

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, ErrorKind};

pub use hrd::HrdDashboard;
pub use pelamar::PelamarDashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    Home,
    Login,
    Register,
    HrdDashboard,
    PelamarDashboard,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "index.html",
            Page::Login => "login.html",
            Page::Register => "register.html",
            Page::HrdDashboard => "dashboard-hrd.html",
            Page::PelamarDashboard => "dashboard-pelamar.html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

/// A banner message shown above the page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(Level::Danger, message)
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        let level = match err.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => Level::Warning,
            _ => Level::Danger,
        };
        Notice::new(level, err.message())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        };
        write!(f, "[{level}] {}", self.message)
    }
}

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Long Indonesian date, e.g. `1 Januari 2024`.
pub fn format_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

/// `start - end`, with `Saat Ini` for an ongoing entry.
pub fn format_period(start: Option<NaiveDate>, end: Option<NaiveDate>, is_current: bool) -> String {
    let start = start.map(format_date).unwrap_or_else(|| "-".to_string());
    let end = if is_current {
        "Saat Ini".to_string()
    } else {
        end.map(format_date).unwrap_or_else(|| "-".to_string())
    };
    format!("{start} - {end}")
}

/// Rupiah with dot grouping, e.g. `Rp 5.000.000`.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}Rp {grouped}")
}

/// Salary range label; a missing maximum repeats the minimum.
pub fn format_salary(min: Option<i64>, max: Option<i64>) -> Option<String> {
    let min = min?;
    let max = max.unwrap_or(min);
    Some(format!("{} - {}", format_rupiah(min), format_rupiah(max)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_indonesian_dates() {
        assert_eq!(format_date(date(2024, 1, 1)), "1 Januari 2024");
        assert_eq!(format_date(date(2023, 8, 17)), "17 Agustus 2023");
    }

    #[test]
    fn ongoing_period_ends_with_saat_ini() {
        assert_eq!(
            format_period(Some(date(2022, 5, 2)), Some(date(2023, 1, 1)), true),
            "2 Mei 2022 - Saat Ini"
        );
        assert_eq!(format_period(None, None, false), "- - -");
    }

    #[test]
    fn formats_rupiah() {
        assert_eq!(format_rupiah(5_000_000), "Rp 5.000.000");
        assert_eq!(format_rupiah(750), "Rp 750");
        assert_eq!(
            format_salary(Some(4_500_000), None).as_deref(),
            Some("Rp 4.500.000 - Rp 4.500.000")
        );
        assert_eq!(format_salary(None, Some(1)), None);
    }

    #[test]
    fn notice_levels_follow_error_kind() {
        let notice = Notice::from(&AppError::bad_request("title is required"));
        assert_eq!(notice.level, Level::Warning);
        assert_eq!(notice.to_string(), "[warning] title is required");
        let notice = Notice::from(&AppError::not_found());
        assert_eq!(notice.level, Level::Danger);
    }
}
