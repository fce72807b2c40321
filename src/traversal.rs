//! Reading sites back out of a store.

use crate::model::Site;
use crate::storage::HierarchicalStore;
use crate::Result;

/// Label a site number the way segment names do: `3` → `"Site3"`.
pub fn site_label(site_number: u32) -> String {
    format!("Site{site_number}")
}

/// Fetch `Site{site_number}` with its derived indices rebuilt, or `None`.
pub async fn get_site<S>(store: &S, site_number: u32) -> Result<Option<Site>>
where
    S: HierarchicalStore + ?Sized,
{
    let label = site_label(site_number);
    let Some(mut site) = store.get_site(&label).await? else {
        tracing::debug!(site = %label, "site not in store");
        return Ok(None);
    };
    site.rebuild_relationships();
    Ok(Some(site))
}
