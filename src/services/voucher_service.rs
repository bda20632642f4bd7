use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    checkout::{
        Voucher,
        vouchers::{DiscountType, eligible_vouchers},
    },
    db::OrmConn,
    dto::vouchers::VoucherList,
    entity::promotions::{Column as PromoCol, Entity as Promotions, Model as PromotionModel},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Active voucher promotions in creation order. Rows with an unknown
/// discount type are skipped.
pub async fn load_active_vouchers(orm: &OrmConn) -> AppResult<Vec<Voucher>> {
    let rows = Promotions::find()
        .filter(
            Condition::all()
                .add(PromoCol::PromoType.eq("voucher"))
                .add(PromoCol::Status.eq("active")),
        )
        .order_by_asc(PromoCol::CreatedAt)
        .all(orm)
        .await?;

    Ok(rows.into_iter().filter_map(voucher_from_entity).collect())
}

pub async fn list_eligible(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<VoucherList>> {
    let cart = state.carts.load(user.user_id);
    let vouchers = load_active_vouchers(&state.orm).await?;
    let items = eligible_vouchers(vouchers, Utc::now(), cart.seller_id());

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        VoucherList { items },
        Some(Meta::new(1, total, total)),
    ))
}

fn voucher_from_entity(model: PromotionModel) -> Option<Voucher> {
    let discount_type = match model.discount_type.parse::<DiscountType>() {
        Ok(discount_type) => discount_type,
        Err(err) => {
            tracing::warn!(promotion_id = %model.id, error = %err, "skipping voucher");
            return None;
        }
    };
    Some(Voucher {
        id: model.id,
        owner_seller_id: model.seller_id,
        name: model.name,
        code: model.code,
        discount_type,
        discount_value: model.discount_value,
        min_purchase: model.min_purchase,
        max_discount: model.max_discount,
        status: model.status,
        start_date: model.start_date.map(|dt| dt.with_timezone(&Utc)),
        end_date: model.end_date.map(|dt| dt.with_timezone(&Utc)),
    })
}
