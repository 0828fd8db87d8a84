//! 预购完成时间估算

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// 默认预购交付工作日数
pub const DEFAULT_PREORDER_LEAD_DAYS: u32 = 3;

/// 从 `from` 起向后推 `lead_business_days` 个工作日（跳过周六、周日）
pub fn preorder_eta(from: DateTime<Utc>, lead_business_days: u32) -> DateTime<Utc> {
    let mut eta = from;
    let mut remaining = lead_business_days;
    while remaining > 0 {
        eta += Duration::days(1);
        if !matches!(eta.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    eta
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_weekday_start() {
        // 2026-10-19 周一 → 周四
        assert_eq!(preorder_eta(at(2026, 10, 19), 3), at(2026, 10, 22));
    }

    #[test]
    fn test_skips_weekend() {
        // 2026-10-22 周四 + 3 工作日 → 下周二
        assert_eq!(preorder_eta(at(2026, 10, 22), 3), at(2026, 10, 27));
        // 周六下单 + 1 → 周一
        assert_eq!(preorder_eta(at(2026, 10, 24), 1), at(2026, 10, 26));
    }

    #[test]
    fn test_zero_lead_is_identity() {
        let now = at(2026, 10, 24);
        assert_eq!(preorder_eta(now, 0), now);
    }
}
