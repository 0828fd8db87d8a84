//! 单元测试共用的领域对象构造

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::models::{
    Collection, Currency, DrumSheet, Order, OrderStatus, OrderType, PaymentMethod, PaymentStatus,
    Profile, SalesType,
};

pub(crate) fn sample_order(order_type: OrderType) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        order_number: "DS20261019120000123456".into(),
        user_id: Uuid::new_v4(),
        order_type,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        payment_method: PaymentMethod::PayPal,
        payment_provider: None,
        total_amount: 12_000,
        display_currency: Currency::Usd,
        display_amount: 889,
        transaction_id: None,
        metadata: json!({}),
        expected_completion_at: None,
        paid_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_sheet(price: i64, sales_type: SalesType, has_file: bool) -> DrumSheet {
    let now = Utc::now();
    let id = Uuid::new_v4();
    DrumSheet {
        id,
        title: format!("Sheet {}", &id.to_string()[..8]),
        artist: "Test Artist".into(),
        category_id: None,
        difficulty: Some("intermediate".into()),
        price,
        sales_type,
        pdf_path: has_file.then(|| format!("pdfs/{}.pdf", id)),
        preview_image_url: None,
        thumbnail_url: None,
        youtube_url: None,
        page_count: Some(4),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_collection(original_price: i64, sale_price: i64) -> Collection {
    let now = Utc::now();
    Collection {
        id: Uuid::new_v4(),
        title: "Rock Classics".into(),
        description: None,
        thumbnail_url: None,
        original_price,
        sale_price,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_profile(user_id: Uuid, credits: i64) -> Profile {
    let now = Utc::now();
    Profile {
        id: user_id,
        email: Some("drummer@example.com".into()),
        display_name: Some("drummer".into()),
        credits,
        is_admin: false,
        created_at: now,
        updated_at: now,
    }
}
