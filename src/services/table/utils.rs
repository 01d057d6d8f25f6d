use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::Cell;

const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

// Two-digit-year layouts precede their four-digit twins.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
];

// Month-first is tried before day-first, matching the usual autodetect default.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%Y-%B-%d",
    "%d-%B-%y",
    "%d-%B-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
    "%A, %d %B %Y",
];

// Layouts without a day; the first of the month is implied.
const MONTH_FORMATS: &[&str] = &[
    "%Y-%m",
    "%Y/%m",
    "%m/%Y",
    "%m-%Y",
    "%B %Y",
    "%B, %Y",
    "%B-%Y",
];

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Za-z][0-9A-Za-z ,./:+\-]*$").expect("date shape pattern is valid")
});

static LEADING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\D").expect("leading year pattern is valid"));

static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit pattern is valid"));

pub fn is_na_token(raw: &str) -> bool {
    NA_TOKENS.contains(&raw.trim())
}

/// Blank and NA tokens become `Missing`.
pub fn text_cell(raw: &str) -> Cell {
    if is_na_token(raw) {
        Cell::Missing
    } else {
        Cell::Text(raw.to_string())
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn try_parse_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => parse_number(s),
        Cell::Date(_) | Cell::Missing => None,
    }
}

pub fn try_parse_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date_str(s),
        Cell::Number(_) | Cell::Missing => None,
    }
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() || parse_number(s).is_some() || !HAS_DIGIT.is_match(s) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    if !DATE_SHAPE.is_match(s) {
        return None;
    }

    parse_with_offset(s)
        .or_else(|| parse_naive(s))
        .or_else(|| strip_utc_suffix(s).and_then(parse_naive))
}

// "%Y" accepts any digit count, so "January 2023" fits "%B %d %Y" as year 23
fn plausible(dt: &NaiveDateTime) -> bool {
    (1000..=9999).contains(&dt.year())
}

fn year_first_ok(s: &str) -> impl Fn(&&&str) -> bool {
    let leading_year = LEADING_YEAR.is_match(s);
    move |fmt: &&&str| leading_year || !fmt.starts_with("%Y")
}

fn parse_with_offset(s: &str) -> Option<NaiveDateTime> {
    OFFSET_FORMATS
        .iter()
        .filter(year_first_ok(s))
        .filter_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.naive_utc())
        .find(plausible)
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let usable = year_first_ok(s);

    let month = MONTH_FORMATS.iter().filter(&usable).find_map(|fmt| {
        NaiveDate::parse_from_str(&format!("{} 01", s), &format!("{} %d", fmt))
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .filter(plausible)
    });

    month
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter(&usable)
                .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .find(plausible)
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .filter(&usable)
                .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .filter_map(|d| d.and_hms_opt(0, 0, 0))
                .find(plausible)
        })
}

fn strip_utc_suffix(s: &str) -> Option<&str> {
    if let Some(rest) = s.strip_suffix("UTC") {
        return Some(rest.trim_end());
    }
    s.strip_suffix('Z')
        .filter(|rest| rest.ends_with(|c: char| c.is_ascii_digit()))
}

/// Spreadsheet serial date: days since 1899-12-30.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

pub fn clean_column_name(name: &str, idx: usize) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_common_date_formats() {
        assert_eq!(parse_date_str("2023-01-05"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_str("01/05/2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_str("25/12/2023"), Some(ymd(2023, 12, 25)));
        assert_eq!(parse_date_str("Jan 5, 2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_str("5 January 2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_str("03/04/21"), Some(ymd(2021, 3, 4)));
        assert_eq!(
            parse_date_str("2023-01-05T10:30:00Z"),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(10, 30, 0)
        );
        assert_eq!(
            parse_date_str("2023-01-05 10:30:15"),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(10, 30, 15)
        );

        let half_past_ten = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(10, 30, 0);
        assert_eq!(parse_date_str("2023-01-05 10:30:00 UTC"), half_past_ten);
        assert_eq!(parse_date_str("2023-01-05 10:30:00Z"), half_past_ten);
        assert_eq!(parse_date_str("2023-01-05T10:30:00.000+0000"), half_past_ten);
        assert_eq!(parse_date_str("2023-01-05T12:30:00+0200"), half_past_ten);
        assert_eq!(parse_date_str("2023.01.05 10:30"), half_past_ten);
    }

    #[test]
    fn test_month_year_dates_start_of_month() {
        assert_eq!(parse_date_str("January 2023"), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date_str("Jan 2023"), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date_str("Sep, 2021"), Some(ymd(2021, 9, 1)));
        assert_eq!(parse_date_str("2023-01"), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date_str("2023/11"), Some(ymd(2023, 11, 1)));
        assert_eq!(parse_date_str("12/2022"), Some(ymd(2022, 12, 1)));
    }

    #[test]
    fn test_short_years_never_read_as_four_digit() {
        assert_eq!(parse_date_str("May 5"), None);
        assert_eq!(parse_date_str("Jan 20 23"), None);
        assert_eq!(parse_date_str("12-25"), None);
    }

    #[test]
    fn test_rejects_non_dates() {
        assert_eq!(parse_date_str("hello"), None);
        assert_eq!(parse_date_str("42"), None);
        assert_eq!(parse_date_str("3.5"), None);
        assert_eq!(parse_date_str("NY"), None);
        assert_eq!(parse_date_str("2023-13-45"), None);
        assert_eq!(parse_date_str(""), None);
    }

    #[test]
    fn test_try_parse_numeric() {
        assert_eq!(try_parse_numeric(&Cell::Number(1.5)), Some(1.5));
        assert_eq!(try_parse_numeric(&Cell::Text(" 42 ".into())), Some(42.0));
        assert_eq!(try_parse_numeric(&Cell::Text("1e3".into())), Some(1000.0));
        assert_eq!(try_parse_numeric(&Cell::Text("inf".into())), None);
        assert_eq!(try_parse_numeric(&Cell::Text("abc".into())), None);
        assert_eq!(try_parse_numeric(&Cell::Missing), None);
    }

    #[test]
    fn test_na_tokens() {
        assert!(is_na_token("   "));
        assert!(is_na_token("NA"));
        assert!(is_na_token(" null "));
        assert!(!is_na_token("0"));
        assert_eq!(text_cell("N/A"), Cell::Missing);
        assert_eq!(text_cell("x"), Cell::Text("x".into()));
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_datetime(44931.0), Some(ymd(2023, 1, 5)));
        assert_eq!(
            excel_serial_to_datetime(44931.5),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(12, 0, 0)
        );
    }

    #[test]
    fn test_clean_column_name() {
        assert_eq!(clean_column_name("  price ", 0), "price");
        assert_eq!(clean_column_name("", 3), "Unnamed: 3");
    }
}
