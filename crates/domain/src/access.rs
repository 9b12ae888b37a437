//! Role checks shared by the services.

use common::Principal;

use crate::error::ShopError;

pub(crate) fn require_admin(principal: Principal) -> Result<(), ShopError> {
    if principal.role.is_admin() {
        Ok(())
    } else {
        Err(ShopError::Unauthorized("admin role required"))
    }
}

pub(crate) fn require_customer(principal: Principal) -> Result<(), ShopError> {
    if principal.role.is_customer() {
        Ok(())
    } else {
        Err(ShopError::Unauthorized("customer role required"))
    }
}
