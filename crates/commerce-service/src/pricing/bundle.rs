//! 合集价格分摊
//!
//! 合集以整体售价出售，订单明细需按单曲定价比例拆分到每张乐谱，
//! 且明细合计必须与合集售价完全一致。

/// 按定价比例分摊合集售价
///
/// 先按比例向下取整，余数逐一分配给定价最高的条目（同价时靠前者优先）。
/// 定价合计为 0 时平均分摊。返回值与 `item_prices` 一一对应。
pub fn allocate_bundle_price(bundle_price: i64, item_prices: &[i64]) -> Vec<i64> {
    let count = item_prices.len();
    if count == 0 {
        return Vec::new();
    }

    let bundle_price = bundle_price.max(0);
    let list_total: i128 = item_prices.iter().map(|p| (*p).max(0) as i128).sum();

    let mut allocations: Vec<i64> = if list_total == 0 {
        vec![bundle_price / count as i64; count]
    } else {
        item_prices
            .iter()
            .map(|p| ((*p).max(0) as i128 * bundle_price as i128 / list_total) as i64)
            .collect()
    };

    let mut remainder = bundle_price - allocations.iter().sum::<i64>();

    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|a, b| item_prices[*b].cmp(&item_prices[*a]).then(a.cmp(b)));

    for idx in order.iter().cycle() {
        if remainder <= 0 {
            break;
        }
        allocations[*idx] += 1;
        remainder -= 1;
    }

    allocations
}
