//! 币种与汇率换算
//!
//! 所有价格以韩元存储，展示币种按用户语言区域选择。
//! 金额统一使用最小货币单位（KRW/JPY 为 1，USD 为 cent）的整数表示。

use serde::{Deserialize, Serialize};
use sheet_shared::config::ExchangeRateConfig;

/// 展示/结算币种
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Krw,
    Usd,
    Jpy,
}

impl Currency {
    /// 最小货币单位的小数位数
    pub fn exponent(&self) -> u32 {
        match self {
            Self::Krw | Self::Jpy => 0,
            Self::Usd => 2,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Krw => "KRW",
            Self::Usd => "USD",
            Self::Jpy => "JPY",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Krw => "₩",
            Self::Usd => "$",
            Self::Jpy => "¥",
        }
    }

    /// 根据语言区域选择币种：ko → KRW，ja → JPY，其他 → USD
    pub fn for_locale(locale: &str) -> Self {
        let lang = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "ko" => Self::Krw,
            "ja" => Self::Jpy,
            _ => Self::Usd,
        }
    }

    /// 解析 ISO 代码（不区分大小写）
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "KRW" => Some(Self::Krw),
            "USD" => Some(Self::Usd),
            "JPY" => Some(Self::Jpy),
            _ => None,
        }
    }

    /// 最小单位金额转十进制字符串，如 889 USD → "8.89"
    pub fn to_decimal_string(&self, minor: i64) -> String {
        let exp = self.exponent();
        if exp == 0 {
            return minor.to_string();
        }
        let scale = 10_i64.pow(exp);
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.unsigned_abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / scale as u64,
            abs % scale as u64,
            width = exp as usize
        )
    }

    /// 解析十进制金额字符串为最小单位，如 "8.89" → 889；小数位超出精度时返回 None
    pub fn parse_decimal(&self, value: &str) -> Option<i64> {
        let value = value.trim();
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let exp = self.exponent() as usize;
        if int_part.is_empty() || frac_part.len() > exp {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let scale = 10_i64.pow(exp as u32);
        let int_value: i64 = int_part.parse().ok()?;
        let frac_value: i64 = if exp == 0 {
            0
        } else {
            format!("{:0<width$}", frac_part, width = exp).parse().ok()?
        };
        let minor = int_value.checked_mul(scale)?.checked_add(frac_value)?;
        Some(if negative { -minor } else { minor })
    }
}

/// 汇率（1 单位外币折合的韩元）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRates {
    pub krw_per_usd: f64,
    pub krw_per_jpy: f64,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self::from(&ExchangeRateConfig::default())
    }
}

impl From<&ExchangeRateConfig> for ExchangeRates {
    fn from(config: &ExchangeRateConfig) -> Self {
        Self {
            krw_per_usd: config.krw_per_usd,
            krw_per_jpy: config.krw_per_jpy,
        }
    }
}

impl ExchangeRates {
    /// 韩元金额换算为目标币种最小单位，四舍五入（远离零）
    pub fn convert(&self, krw: i64, currency: Currency) -> i64 {
        let krw_per_unit = match currency {
            Currency::Krw => return krw,
            Currency::Usd => self.krw_per_usd,
            Currency::Jpy => self.krw_per_jpy,
        };
        let scale = 10_f64.powi(currency.exponent() as i32);
        (krw as f64 / krw_per_unit * scale).round() as i64
    }

    pub fn money(&self, krw: i64, currency: Currency) -> Money {
        Money::new(self.convert(krw, currency), currency)
    }
}

/// 带币种的金额（最小单位）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency: Currency,
    pub amount: i64,
    pub formatted: String,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self {
            currency,
            amount,
            formatted: format_amount(amount, currency),
        }
    }
}

/// 格式化金额：₩12,000 / $8.89 / ¥1,263
pub fn format_amount(minor: i64, currency: Currency) -> String {
    let decimal = currency.to_decimal_string(minor.abs());
    let (int_part, frac_part) = match decimal.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (decimal, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if minor < 0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}{}.{}", sign, currency.symbol(), grouped, frac),
        None => format!("{}{}{}", sign, currency.symbol(), grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_locale() {
        assert_eq!(Currency::for_locale("ko"), Currency::Krw);
        assert_eq!(Currency::for_locale("ko-KR"), Currency::Krw);
        assert_eq!(Currency::for_locale("ja_JP"), Currency::Jpy);
        assert_eq!(Currency::for_locale("en"), Currency::Usd);
        assert_eq!(Currency::for_locale("zh-CN"), Currency::Usd);
        assert_eq!(Currency::for_locale(""), Currency::Usd);
    }

    #[test]
    fn test_convert_rounds_half_away_from_zero() {
        let rates = ExchangeRates::default();
        assert_eq!(rates.convert(12_000, Currency::Krw), 12_000);
        // 12000 / 1350 = 8.888... → 889 cents
        assert_eq!(rates.convert(12_000, Currency::Usd), 889);
        // 12000 / 9.5 = 1263.16 → 1263
        assert_eq!(rates.convert(12_000, Currency::Jpy), 1_263);

        let rates = ExchangeRates {
            krw_per_usd: 1000.0,
            krw_per_jpy: 10.0,
        };
        // 15 / 10 = 1.5 → 2
        assert_eq!(rates.convert(15, Currency::Jpy), 2);
        assert_eq!(rates.convert(-15, Currency::Jpy), -2);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12_000, Currency::Krw), "₩12,000");
        assert_eq!(format_amount(889, Currency::Usd), "$8.89");
        assert_eq!(format_amount(1_263, Currency::Jpy), "¥1,263");
        assert_eq!(format_amount(123_456_789, Currency::Usd), "$1,234,567.89");
        assert_eq!(format_amount(5, Currency::Usd), "$0.05");
        assert_eq!(format_amount(0, Currency::Krw), "₩0");
        assert_eq!(format_amount(-3_000, Currency::Krw), "-₩3,000");
    }

    #[test]
    fn test_decimal_string_conversion() {
        assert_eq!(Currency::Usd.to_decimal_string(889), "8.89");
        assert_eq!(Currency::Usd.to_decimal_string(1_000), "10.00");
        assert_eq!(Currency::Jpy.to_decimal_string(1_263), "1263");

        assert_eq!(Currency::Usd.parse_decimal("8.89"), Some(889));
        assert_eq!(Currency::Usd.parse_decimal("10"), Some(1_000));
        assert_eq!(Currency::Usd.parse_decimal("10.5"), Some(1_050));
        assert_eq!(Currency::Jpy.parse_decimal("1263"), Some(1_263));
        assert_eq!(Currency::Jpy.parse_decimal("1263.5"), None);
        assert_eq!(Currency::Usd.parse_decimal("8.899"), None);
        assert_eq!(Currency::Usd.parse_decimal("abc"), None);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Currency::from_code("usd"), Some(Currency::Usd));
        assert_eq!(Currency::from_code("EUR"), None);
    }
}
