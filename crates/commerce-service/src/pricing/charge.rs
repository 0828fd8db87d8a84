//! 积分充值套餐

use serde::Serialize;
use sheet_shared::config::ChargePackage;

use crate::error::{CommerceError, Result};

/// 充值套餐表
#[derive(Debug, Clone, Serialize)]
pub struct ChargePackages {
    packages: Vec<ChargePackage>,
}

impl ChargePackages {
    pub fn new(mut packages: Vec<ChargePackage>) -> Self {
        packages.sort_by_key(|p| p.amount);
        packages.dedup_by_key(|p| p.amount);
        Self { packages }
    }

    pub fn all(&self) -> &[ChargePackage] {
        &self.packages
    }

    /// 查询充值金额对应的赠送额，未配置的金额视为非法
    pub fn bonus_for(&self, amount: i64) -> Result<i64> {
        self.packages
            .iter()
            .find(|p| p.amount == amount)
            .map(|p| p.bonus)
            .ok_or(CommerceError::InvalidChargeAmount(amount))
    }
}

impl Default for ChargePackages {
    fn default() -> Self {
        Self::new(sheet_shared::config::StoreConfig::default().charge_packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bonus_table() {
        let packages = ChargePackages::default();
        assert_eq!(packages.bonus_for(3_000).unwrap(), 0);
        assert_eq!(packages.bonus_for(10_000).unwrap(), 500);
        assert_eq!(packages.bonus_for(30_000).unwrap(), 3_000);
        assert_eq!(packages.bonus_for(50_000).unwrap(), 6_000);
        assert_eq!(packages.bonus_for(100_000).unwrap(), 15_000);
    }

    #[test]
    fn test_unknown_amount_rejected() {
        let packages = ChargePackages::default();
        let err = packages.bonus_for(7_777).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CHARGE_AMOUNT");
    }

    #[test]
    fn test_packages_sorted_and_deduplicated() {
        let packages = ChargePackages::new(vec![
            ChargePackage { amount: 5_000, bonus: 0 },
            ChargePackage { amount: 1_000, bonus: 0 },
            ChargePackage { amount: 5_000, bonus: 100 },
        ]);
        let amounts: Vec<i64> = packages.all().iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![1_000, 5_000]);
    }
}
