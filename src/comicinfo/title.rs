//! 从标题推断系列名和卷号

use once_cell::sync::Lazy;
use regex::Regex;

/// `Title Vol. 5`、`Title, Volume 12`
static VOLUME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s*,?\s+vol(?:ume)?\.?\s*(\d+(?:\.\d+)?)").expect("invalid volume pattern")
});

/// `Title #3`
static ISSUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*#\s*(\d+(?:\.\d+)?)").expect("invalid issue pattern"));

/// `2003`、`2003-11`、`2003-11-25`，后面可以跟时间
static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?").expect("invalid date pattern")
});

/// 系列名和卷号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub series: String,
    pub number: String,
}

/// 从标题中拆出系列名和卷号，无法识别时整个标题作为系列名、卷号为`1`
///
/// 卷号按原样保留，不去掉前导零。
pub fn parse_series_number(title: &str) -> SeriesInfo {
    let title = title.trim();
    [&*VOLUME_PATTERN, &*ISSUE_PATTERN]
        .iter()
        .find_map(|pattern| {
            let captures = pattern.captures(title)?;
            Some(SeriesInfo {
                series: captures[1].trim().to_string(),
                number: captures[2].to_string(),
            })
        })
        .unwrap_or_else(|| SeriesInfo {
            series: title.to_string(),
            number: "1".to_string(),
        })
}

/// 把calibre的series_index（如`5.0`）整理为卷号
pub fn normalize_series_index(index: &str) -> Option<String> {
    let index = index.trim();
    if index.is_empty() {
        return None;
    }
    match index.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value >= 0.0 => Some(format!("{}", value as u64)),
        _ => Some(index.to_string()),
    }
}

/// 解析`dc:date`的年月日部分，超出范围的月、日被忽略
pub fn parse_date(date: &str) -> (Option<i32>, Option<u32>, Option<u32>) {
    let Some(captures) = DATE_PATTERN.captures(date) else {
        return (None, None, None);
    };

    let year = captures[1].parse().ok();
    let month = captures
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|m| (1..=12).contains(m));
    let day = month.and_then(|_| {
        captures
            .get(3)
            .and_then(|d| d.as_str().parse().ok())
            .filter(|d| (1..=31).contains(d))
    });

    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(title: &str) -> (String, String) {
        let info = parse_series_number(title);
        (info.series, info.number)
    }

    #[test]
    fn test_volume_titles() {
        assert_eq!(series("Berserk Vol. 5"), ("Berserk".into(), "5".into()));
        assert_eq!(series("Vinland Saga, Volume 12"), ("Vinland Saga".into(), "12".into()));
        assert_eq!(series("Dorohedoro vol 007"), ("Dorohedoro".into(), "007".into()));
    }

    #[test]
    fn test_issue_titles() {
        assert_eq!(series("Chainsaw Man #3"), ("Chainsaw Man".into(), "3".into()));
        assert_eq!(series("Saga # 10.5"), ("Saga".into(), "10.5".into()));
    }

    #[test]
    fn test_plain_title() {
        assert_eq!(series("One-Shot"), ("One-Shot".into(), "1".into()));
        assert_eq!(series("  Volcano  "), ("Volcano".into(), "1".into()));
    }

    #[test]
    fn test_series_index() {
        assert_eq!(normalize_series_index("5.0").as_deref(), Some("5"));
        assert_eq!(normalize_series_index("2.5").as_deref(), Some("2.5"));
        assert_eq!(normalize_series_index(""), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2003-11-25"), (Some(2003), Some(11), Some(25)));
        assert_eq!(parse_date("2019-04-01T00:00:00+00:00"), (Some(2019), Some(4), Some(1)));
        assert_eq!(parse_date("1999"), (Some(1999), None, None));
        assert_eq!(parse_date("2001-13-40"), (Some(2001), None, None));
        assert_eq!(parse_date("unknown"), (None, None, None));
    }
}
