//! Site registry.
//!
//! Maps site labels to the Site containers of one import run. The first
//! encounter of a label decides the site's depths and array layout; later
//! encounters get the same site back untouched, whatever they carry.

use hashbrown::HashMap;

use crate::index::ArrayLayout;
use crate::metadata::DepthTag;
use crate::model::{Site, SiteId};

#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    by_name: HashMap<String, SiteId>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing site for `name`, or a new one stamped with `depths` and `layout`.
    ///
    /// Returns the site id and whether it was created by this call.
    pub fn get_or_create(&mut self, name: &str, depths: &[DepthTag], layout: ArrayLayout) -> (SiteId, bool) {
        self.get_or_create_with(name, depths, || layout)
    }

    /// Like [`get_or_create`](Self::get_or_create), computing the layout only
    /// when a site is actually created.
    pub fn get_or_create_with<F>(&mut self, name: &str, depths: &[DepthTag], layout: F) -> (SiteId, bool)
    where
        F: FnOnce() -> ArrayLayout,
    {
        if let Some(&id) = self.by_name.get(name) {
            tracing::debug!(site = name, "reusing site");
            return (id, false);
        }

        let layout = layout();
        let mut site = Site::new(name, layout);
        for tag in depths {
            site.stamp_depth(tag.axis.clone(), tag.value);
        }
        tracing::info!(
            site = name,
            depths = ?site.depths_um,
            arrays = layout.num_arrays,
            channels_per_array = layout.channels_per_array,
            "creating site"
        );

        let id = SiteId(self.sites.len());
        self.sites.push(site);
        self.by_name.insert(name.to_owned(), id);
        (id, true)
    }

    pub fn find(&self, name: &str) -> Option<SiteId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id.0)
    }

    pub fn get_mut(&mut self, id: SiteId) -> Option<&mut Site> {
        self.sites.get_mut(id.0)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn sites_mut(&mut self) -> &mut [Site] {
        &mut self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Hand over the sites in creation order.
    pub fn into_sites(self) -> Vec<Site> {
        self.sites
    }
}
