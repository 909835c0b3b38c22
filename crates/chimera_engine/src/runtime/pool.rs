use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::catalog::PrefabCatalog;

use super::math::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    id: InstanceId,
    template_id: String,
    placement: Placement,
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Pooled,
    /// The template was over its ceiling; the instance was dropped instead.
    Destroyed,
    /// The instance was not checked out from this pool.
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub templates: usize,
    pub available: usize,
    pub in_use: usize,
    pub allocated_total: u64,
    pub destroyed_total: u64,
}

#[derive(Debug)]
struct TemplatePool {
    available: Vec<Instance>,
    in_use: HashSet<InstanceId>,
    capacity: usize,
}

impl TemplatePool {
    fn new(capacity: usize) -> Self {
        Self {
            available: Vec::new(),
            in_use: HashSet::new(),
            capacity,
        }
    }

    fn total(&self) -> usize {
        self.available.len() + self.in_use.len()
    }
}

/// Per-template free lists. Exhaustion falls back to a fresh allocation;
/// surplus instances are destroyed when released over the ceiling.
#[derive(Debug)]
pub struct InstancePool {
    pools: HashMap<String, TemplatePool>,
    default_capacity: usize,
    next_id: u64,
    allocated_total: u64,
    destroyed_total: u64,
}

impl InstancePool {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            pools: HashMap::new(),
            default_capacity,
            next_id: 0,
            allocated_total: 0,
            destroyed_total: 0,
        }
    }

    pub fn acquire(&mut self, catalog: &PrefabCatalog, template_id: &str) -> Option<Instance> {
        if let Some(pool) = self.pools.get_mut(template_id) {
            if let Some(instance) = pool.available.pop() {
                pool.in_use.insert(instance.id);
                return Some(instance);
            }
        }

        let entry = catalog.lookup(template_id)?;
        let capacity = entry.pool_capacity.unwrap_or(self.default_capacity);
        let instance = self.allocate(template_id);
        let pool = self
            .pools
            .entry(template_id.to_string())
            .or_insert_with(|| TemplatePool::new(capacity));
        if pool.total() >= pool.capacity {
            debug!(
                template_id,
                capacity = pool.capacity,
                in_use = pool.in_use.len(),
                "pool_overflow_allocation"
            );
        }
        pool.in_use.insert(instance.id);
        Some(instance)
    }

    pub fn release(&mut self, mut instance: Instance) -> ReleaseOutcome {
        let Some(pool) = self.pools.get_mut(&instance.template_id) else {
            warn!(
                template_id = %instance.template_id,
                instance_id = instance.id.0,
                "pool_release_unknown_template"
            );
            return ReleaseOutcome::Rejected;
        };
        if !pool.in_use.remove(&instance.id) {
            warn!(
                template_id = %instance.template_id,
                instance_id = instance.id.0,
                "pool_release_not_in_use"
            );
            return ReleaseOutcome::Rejected;
        }
        if pool.total() >= pool.capacity {
            self.destroyed_total = self.destroyed_total.saturating_add(1);
            return ReleaseOutcome::Destroyed;
        }
        instance.placement = Placement::default();
        pool.available.push(instance);
        ReleaseOutcome::Pooled
    }

    /// Checks an instance back in without returning it to the free list.
    pub fn discard(&mut self, instance: Instance) -> bool {
        let removed = self
            .pools
            .get_mut(&instance.template_id)
            .is_some_and(|pool| pool.in_use.remove(&instance.id));
        if removed {
            self.destroyed_total = self.destroyed_total.saturating_add(1);
        }
        removed
    }

    /// Grows the free list for `template_id` by up to `count`, never past
    /// its ceiling. Returns how many instances were built.
    pub fn preload(&mut self, catalog: &PrefabCatalog, template_id: &str, count: usize) -> usize {
        let Some(entry) = catalog.lookup(template_id) else {
            warn!(template_id, "pool_preload_unknown_template");
            return 0;
        };
        let capacity = entry.pool_capacity.unwrap_or(self.default_capacity);
        let headroom = {
            let pool = self
                .pools
                .entry(template_id.to_string())
                .or_insert_with(|| TemplatePool::new(capacity));
            pool.capacity.saturating_sub(pool.total())
        };
        let to_build = count.min(headroom);
        for _ in 0..to_build {
            let instance = self.allocate(template_id);
            if let Some(pool) = self.pools.get_mut(template_id) {
                pool.available.push(instance);
            }
        }
        to_build
    }

    /// Adjusts the ceiling for `template_id`. Surplus free instances are
    /// destroyed right away; checked-out ones are trimmed as they return.
    pub fn set_capacity(&mut self, template_id: &str, capacity: usize) -> usize {
        let pool = self
            .pools
            .entry(template_id.to_string())
            .or_insert_with(|| TemplatePool::new(capacity));
        pool.capacity = capacity;
        let surplus = pool.total().saturating_sub(capacity).min(pool.available.len());
        pool.available.truncate(pool.available.len() - surplus);
        self.destroyed_total = self.destroyed_total.saturating_add(surplus as u64);
        surplus
    }

    pub fn capacity(&self, template_id: &str) -> Option<usize> {
        self.pools.get(template_id).map(|pool| pool.capacity)
    }

    pub fn available_count(&self, template_id: &str) -> usize {
        self.pools
            .get(template_id)
            .map_or(0, |pool| pool.available.len())
    }

    pub fn in_use_count(&self, template_id: &str) -> usize {
        self.pools
            .get(template_id)
            .map_or(0, |pool| pool.in_use.len())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            templates: self.pools.len(),
            available: self.pools.values().map(|pool| pool.available.len()).sum(),
            in_use: self.pools.values().map(|pool| pool.in_use.len()).sum(),
            allocated_total: self.allocated_total,
            destroyed_total: self.destroyed_total,
        }
    }

    fn allocate(&mut self, template_id: &str) -> Instance {
        let id = InstanceId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.allocated_total = self.allocated_total.saturating_add(1);
        Instance {
            id,
            template_id: template_id.to_string(),
            placement: Placement::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TemplateCategory, TemplateEntry};

    fn catalog() -> PrefabCatalog {
        PrefabCatalog::from_entries(vec![
            TemplateEntry::new("sparkles", TemplateCategory::Particle, "Sparkles")
                .with_pool_capacity(2),
            TemplateEntry::new("lamp", TemplateCategory::Equipment, "Lamp"),
        ])
    }

    #[test]
    fn acquire_then_release_keeps_available_count() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        assert_eq!(pool.preload(&catalog, "lamp", 3), 3);
        let before = pool.available_count("lamp");

        let instance = pool.acquire(&catalog, "lamp").expect("instance");
        assert_eq!(pool.available_count("lamp"), before - 1);
        assert_eq!(pool.release(instance), ReleaseOutcome::Pooled);
        assert_eq!(pool.available_count("lamp"), before);
    }

    #[test]
    fn instance_lives_in_exactly_one_set() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        let instance = pool.acquire(&catalog, "lamp").expect("instance");
        assert_eq!(pool.in_use_count("lamp"), 1);
        assert_eq!(pool.available_count("lamp"), 0);

        let copy = instance.clone();
        assert_eq!(pool.release(instance), ReleaseOutcome::Pooled);
        assert_eq!(pool.in_use_count("lamp"), 0);
        assert_eq!(pool.available_count("lamp"), 1);
        assert_eq!(pool.release(copy), ReleaseOutcome::Rejected);
        assert_eq!(pool.available_count("lamp"), 1);
    }

    #[test]
    fn unknown_template_with_empty_pool_yields_none() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        assert!(pool.acquire(&catalog, "ghost").is_none());
        assert_eq!(pool.preload(&catalog, "ghost", 4), 0);
    }

    #[test]
    fn exhaustion_allocates_fresh_and_overflow_is_destroyed_on_release() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        let a = pool.acquire(&catalog, "sparkles").expect("a");
        let b = pool.acquire(&catalog, "sparkles").expect("b");
        let c = pool.acquire(&catalog, "sparkles").expect("overflow");
        assert_eq!(pool.in_use_count("sparkles"), 3);
        assert_ne!(a.id(), c.id());

        assert_eq!(pool.release(a), ReleaseOutcome::Destroyed);
        assert_eq!(pool.release(b), ReleaseOutcome::Pooled);
        assert_eq!(pool.release(c), ReleaseOutcome::Pooled);
        assert_eq!(pool.available_count("sparkles"), 2);
        assert_eq!(pool.stats().destroyed_total, 1);
    }

    #[test]
    fn discard_removes_from_in_use_without_pooling() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        let instance = pool.acquire(&catalog, "lamp").expect("instance");
        let copy = instance.clone();
        assert!(pool.discard(instance));
        assert!(!pool.discard(copy));
        assert_eq!(pool.in_use_count("lamp"), 0);
        assert_eq!(pool.available_count("lamp"), 0);
    }

    #[test]
    fn preload_stops_at_capacity() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        assert_eq!(pool.preload(&catalog, "sparkles", 10), 2);
        assert_eq!(pool.preload(&catalog, "sparkles", 1), 0);
        assert_eq!(pool.capacity("sparkles"), Some(2));
    }

    #[test]
    fn shrinking_capacity_trims_free_instances() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        pool.preload(&catalog, "lamp", 6);
        let first = pool.acquire(&catalog, "lamp").expect("first");
        let second = pool.acquire(&catalog, "lamp").expect("second");
        let _third = pool.acquire(&catalog, "lamp").expect("third");

        assert_eq!(pool.set_capacity("lamp", 2), 3);
        assert_eq!(pool.available_count("lamp"), 0);
        assert_eq!(pool.release(first), ReleaseOutcome::Destroyed);
        assert_eq!(pool.release(second), ReleaseOutcome::Pooled);
        assert_eq!(pool.available_count("lamp"), 1);
    }

    #[test]
    fn released_instance_resets_placement() {
        let catalog = catalog();
        let mut pool = InstancePool::new(8);
        let mut instance = pool.acquire(&catalog, "lamp").expect("instance");
        instance.set_placement(Placement::at(crate::runtime::Vec3::new(1.0, 2.0, 3.0)));
        pool.release(instance);
        let again = pool.acquire(&catalog, "lamp").expect("again");
        assert_eq!(again.placement(), Placement::default());
    }
}
