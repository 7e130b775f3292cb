use crate::{db_types::Capability, traits::StoreError};

/// Organization capability lookups, consumed by the eligibility rules.
#[allow(async_fn_in_trait)]
pub trait PermissionManagement: Clone {
    async fn has_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<bool, StoreError>;

    async fn grant_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<(), StoreError>;

    async fn revoke_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<u64, StoreError>;
}
