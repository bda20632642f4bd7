use serde::Serialize;
use utoipa::ToSchema;

use crate::checkout::Voucher;

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherList {
    pub items: Vec<Voucher>,
}
