use serde::{Deserialize, Serialize};

/// Tenant boundary for reads and writes.
///
/// An absent tenant is single-tenant demo mode and sees every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantScope(Option<String>);
impl TenantScope {
	pub fn demo() -> Self {
		Self(None)
	}

	/// Blank identifiers collapse to demo mode.
	pub fn new(tenant_id: Option<&str>) -> Self {
		Self(tenant_id.map(str::trim).filter(|id| !id.is_empty()).map(ToString::to_string))
	}

	pub fn tenant(tenant_id: &str) -> Self {
		Self::new(Some(tenant_id))
	}

	pub fn as_deref(&self) -> Option<&str> {
		self.0.as_deref()
	}

	pub fn is_demo(&self) -> bool {
		self.0.is_none()
	}

	pub fn admits(&self, row_tenant: Option<&str>) -> bool {
		match self.0.as_deref() {
			None => true,
			Some(tenant) => row_tenant == Some(tenant),
		}
	}
}

pub trait TenantOwned {
	fn tenant_id(&self) -> Option<&str>;
}

/// Drops rows outside `scope`, returning the kept rows and the number dropped.
pub fn retain_in_scope<T>(rows: Vec<T>, scope: &TenantScope) -> (Vec<T>, usize)
where
	T: TenantOwned,
{
	let before = rows.len();
	let kept = rows.into_iter().filter(|row| scope.admits(row.tenant_id())).collect::<Vec<_>>();
	let dropped = before - kept.len();

	(kept, dropped)
}
