//! Text helpers used by the type conversion registry and context-aware
//! command text parameterization.

use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;

use crate::error::{CastError, Result};

static TIME_DELTA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+\-><])(\d+)\.(day|second|minute|hour|week)s?$").expect("valid delta regex")
});

static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D+").expect("valid regex"));

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_]+").expect("valid regex"));

/// Compact timestamp layout: year month day hour minute second micros.
const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Parses a human-friendly datetime expression.
///
/// Accepted inputs:
/// - keywords `now` and `today`
/// - signed deltas such as `+3.days`, `-45.minutes`, `>1.week`, `<2.hours`
/// - digit runs interpreted as `%Y%m%d%H%M%S%f`, zero-padded on the right
///   (`231101` means 2023-11-01, `20231101 1230` means 12:30 that day)
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, CastError> {
    let now = Local::now().naive_local();
    if input == "now" {
        return Ok(now);
    }
    if input == "today" {
        return Ok(now.date().into());
    }

    if let Some(captures) = TIME_DELTA_RE.captures(input) {
        let backwards = matches!(&captures[1], "-" | "<");
        let amount: i64 = captures[2].parse().map_err(|_| CastError::datetime(input))?;
        let delta = match &captures[3] {
            "second" => Duration::seconds(amount),
            "minute" => Duration::minutes(amount),
            "hour" => Duration::hours(amount),
            "day" => Duration::days(amount),
            "week" => Duration::weeks(amount),
            _ => return Err(CastError::datetime(input)),
        };
        return Ok(if backwards { now - delta } else { now + delta });
    }

    let mut digits: String = NON_DIGIT_RE.replace_all(input, "").into_owned();
    if digits.len() == 6 {
        digits = format!("20{digits}{}", "0".repeat(12));
    } else if digits.len() >= 8 && digits.len() < 20 {
        let padding = 20 - digits.len();
        digits.push_str(&"0".repeat(padding));
    }
    if digits.len() == 20 {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&digits, COMPACT_FORMAT) {
            return Ok(parsed);
        }
    }
    Err(CastError::datetime(input))
}

/// Folds Vietnamese diacritics down to plain ASCII letters.
pub fn fold_ascii(text: &str) -> String {
    text.chars()
        .map(|c| {
            match c {
                'á' | 'à' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ắ' | 'ằ' | 'ẳ' | 'ẵ' | 'ặ' | 'â'
                | 'ấ' | 'ầ' | 'ẩ' | 'ẫ' | 'ậ' => 'a',
                'Á' | 'À' | 'Ả' | 'Ã' | 'Ạ' | 'Ă' | 'Ắ' | 'Ằ' | 'Ẳ' | 'Ẵ' | 'Ặ' | 'Â'
                | 'Ấ' | 'Ầ' | 'Ẩ' | 'Ẫ' | 'Ậ' => 'A',
                'é' | 'è' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ế' | 'ề' | 'ể' | 'ễ' | 'ệ' => 'e',
                'É' | 'È' | 'Ẻ' | 'Ẽ' | 'Ẹ' | 'Ê' | 'Ế' | 'Ề' | 'Ể' | 'Ễ' | 'Ệ' => 'E',
                'í' | 'ì' | 'ỉ' | 'ĩ' | 'ị' => 'i',
                'Í' | 'Ì' | 'Ỉ' | 'Ĩ' | 'Ị' => 'I',
                'ó' | 'ò' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ố' | 'ồ' | 'ổ' | 'ỗ' | 'ộ' | 'ơ'
                | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ' => 'o',
                'Ó' | 'Ò' | 'Ỏ' | 'Õ' | 'Ọ' | 'Ô' | 'Ố' | 'Ồ' | 'Ổ' | 'Ỗ' | 'Ộ' | 'Ơ'
                | 'Ớ' | 'Ờ' | 'Ở' | 'Ỡ' | 'Ợ' => 'O',
                'ú' | 'ù' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ứ' | 'ừ' | 'ử' | 'ữ' | 'ự' => 'u',
                'Ú' | 'Ù' | 'Ủ' | 'Ũ' | 'Ụ' | 'Ư' | 'Ứ' | 'Ừ' | 'Ử' | 'Ữ' | 'Ự' => 'U',
                'ý' | 'ỳ' | 'ỷ' | 'ỹ' | 'ỵ' => 'y',
                'Ý' | 'Ỳ' | 'Ỷ' | 'Ỹ' | 'Ỵ' => 'Y',
                'đ' => 'd',
                'Đ' => 'D',
                other => other,
            }
        })
        .collect()
}

/// Replaces whole words of `text` using the given substitution table.
///
/// Used by context-aware text parameterization to turn generic command
/// descriptions ("Create new record") into context-specific ones
/// ("Create new user").
pub fn translate_words(text: &str, substitutions: &[(&str, &str)]) -> String {
    WORD_RE
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let word = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
            substitutions
                .iter()
                .find(|(from, _)| *from == word)
                .map(|(_, to)| (*to).to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_datetime_keywords() {
        assert!(parse_datetime("now").is_ok());
        let today = parse_datetime("today").unwrap();
        assert_eq!(today.hour(), 0);
        assert_eq!(today.minute(), 0);
    }

    #[test]
    fn test_parse_datetime_deltas() {
        let plus = parse_datetime("+2.days").unwrap();
        let minus = parse_datetime("-2.days").unwrap();
        assert!(plus > minus);
        assert!(parse_datetime(">1.week").is_ok());
        assert!(parse_datetime("<30.minutes").is_ok());
    }

    #[test]
    fn test_parse_datetime_compact_digits() {
        let short = parse_datetime("231101").unwrap();
        assert_eq!(short.format("%Y-%m-%d").to_string(), "2023-11-01");

        let with_time = parse_datetime("2023-11-01 12:30").unwrap();
        assert_eq!(with_time.format("%Y-%m-%d %H:%M").to_string(), "2023-11-01 12:30");
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(parse_datetime("tomorrow").is_err());
        assert!(parse_datetime("12").is_err());
    }

    #[test]
    fn test_fold_ascii() {
        assert_eq!(fold_ascii("Tiếng Việt"), "Tieng Viet");
        assert_eq!(fold_ascii("plain"), "plain");
    }

    #[test]
    fn test_translate_words_whole_words_only() {
        let result = translate_words(
            "Create new record in records",
            &[("record", "user"), ("records", "users")],
        );
        assert_eq!(result, "Create new user in users");
    }
}
