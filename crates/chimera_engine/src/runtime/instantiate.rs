use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::catalog::PrefabCatalog;

use super::math::Placement;
use super::pool::{Instance, InstanceId, InstancePool, ReleaseOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

pub type CompletionCallback = Box<dyn FnOnce(RequestId, Option<InstanceId>)>;

struct LoadRequest {
    id: RequestId,
    template_id: String,
    placement: Placement,
    callback: Option<CompletionCallback>,
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("id", &self.id)
            .field("template_id", &self.template_id)
            .field("placement", &self.placement)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInstanceRecord {
    pub instance: Instance,
    pub pooled: bool,
    pub created_at: Duration,
    pub last_access: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instantiation {
    Ready(InstanceId),
    Deferred(RequestId),
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDrain {
    pub fulfilled: Vec<(RequestId, Option<InstanceId>)>,
    pub remaining: usize,
}

/// Resolves template ids to live instances under a per-frame budget.
/// Requests past the budget wait in a FIFO queue that is drained at the
/// same rate on later frames.
#[derive(Debug)]
pub struct InstantiationFacade {
    pool: InstancePool,
    max_per_frame: u32,
    spawned_this_frame: u32,
    queue: VecDeque<LoadRequest>,
    active: HashMap<InstanceId, ActiveInstanceRecord>,
    next_request_id: u64,
}

impl InstantiationFacade {
    pub fn new(max_per_frame: u32, default_pool_capacity: usize) -> Self {
        Self {
            pool: InstancePool::new(default_pool_capacity),
            max_per_frame: max_per_frame.max(1),
            spawned_this_frame: 0,
            queue: VecDeque::new(),
            active: HashMap::new(),
            next_request_id: 0,
        }
    }

    pub fn max_per_frame(&self) -> u32 {
        self.max_per_frame
    }

    pub fn spawned_this_frame(&self) -> u32 {
        self.spawned_this_frame
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    pub fn preload(&mut self, catalog: &PrefabCatalog, template_id: &str, count: usize) -> usize {
        self.pool.preload(catalog, template_id, count)
    }

    pub fn set_capacity(&mut self, template_id: &str, capacity: usize) -> usize {
        self.pool.set_capacity(template_id, capacity)
    }

    /// Starts a new frame: resets the budget and fulfils queued requests in
    /// arrival order until the budget is spent.
    pub fn begin_frame(&mut self, catalog: &PrefabCatalog, now: Duration) -> FrameDrain {
        self.spawned_this_frame = 0;
        let mut drain = FrameDrain::default();

        while self.spawned_this_frame < self.max_per_frame {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            let result = self.spawn_now(catalog, &request.template_id, request.placement, now);
            if let Some(callback) = request.callback {
                callback(request.id, result);
            }
            drain.fulfilled.push((request.id, result));
        }

        drain.remaining = self.queue.len();
        if !drain.fulfilled.is_empty() {
            debug!(
                fulfilled = drain.fulfilled.len(),
                remaining = drain.remaining,
                "instantiate_queue_drained"
            );
        }
        drain
    }

    pub fn instantiate(
        &mut self,
        catalog: &PrefabCatalog,
        template_id: &str,
        placement: Placement,
        now: Duration,
    ) -> Instantiation {
        if !catalog.contains(template_id) {
            warn!(template_id, "instantiate_template_not_found");
            return Instantiation::NotFound;
        }
        if self.spawned_this_frame >= self.max_per_frame {
            let id = self.enqueue(template_id, placement, None);
            debug!(
                template_id,
                request_id = id.0,
                queued = self.queue.len(),
                "instantiate_deferred"
            );
            return Instantiation::Deferred(id);
        }
        match self.spawn_now(catalog, template_id, placement, now) {
            Some(id) => Instantiation::Ready(id),
            None => Instantiation::NotFound,
        }
    }

    /// Always queues; `callback` runs exactly once when the request is
    /// drained, with `None` if the template could not be resolved.
    pub fn instantiate_async(
        &mut self,
        template_id: &str,
        placement: Placement,
        callback: CompletionCallback,
    ) -> RequestId {
        self.enqueue(template_id, placement, Some(callback))
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.active.get(&id).map(|record| &record.instance)
    }

    pub fn record(&self, id: InstanceId) -> Option<&ActiveInstanceRecord> {
        self.active.get(&id)
    }

    pub fn touch(&mut self, id: InstanceId, now: Duration) -> bool {
        match self.active.get_mut(&id) {
            Some(record) => {
                record.last_access = now;
                true
            }
            None => false,
        }
    }

    pub fn move_instance(&mut self, id: InstanceId, placement: Placement, now: Duration) -> bool {
        match self.active.get_mut(&id) {
            Some(record) => {
                record.instance.set_placement(placement);
                record.last_access = now;
                true
            }
            None => false,
        }
    }

    /// Hands the instance back to its pool, or drops it when its template is
    /// not pooled.
    pub fn release(&mut self, id: InstanceId) -> Option<ReleaseOutcome> {
        let record = self.active.remove(&id)?;
        if record.pooled {
            Some(self.pool.release(record.instance))
        } else {
            self.pool.discard(record.instance);
            Some(ReleaseOutcome::Destroyed)
        }
    }

    pub fn destroy(&mut self, id: InstanceId) -> bool {
        match self.active.remove(&id) {
            Some(record) => self.pool.discard(record.instance),
            None => false,
        }
    }

    /// Reclaims every instance not accessed for longer than `timeout`.
    pub fn sweep_idle(&mut self, now: Duration, timeout: Duration) -> usize {
        let mut idle = self
            .active
            .values()
            .filter(|record| now.saturating_sub(record.last_access) > timeout)
            .map(|record| record.instance.id())
            .collect::<Vec<_>>();
        idle.sort_unstable();

        for id in &idle {
            self.release(*id);
        }
        if !idle.is_empty() {
            debug!(
                reclaimed = idle.len(),
                active = self.active.len(),
                "instance_idle_sweep"
            );
        }
        idle.len()
    }

    fn enqueue(
        &mut self,
        template_id: &str,
        placement: Placement,
        callback: Option<CompletionCallback>,
    ) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.queue.push_back(LoadRequest {
            id,
            template_id: template_id.to_string(),
            placement,
            callback,
        });
        id
    }

    fn spawn_now(
        &mut self,
        catalog: &PrefabCatalog,
        template_id: &str,
        placement: Placement,
        now: Duration,
    ) -> Option<InstanceId> {
        let Some(entry) = catalog.lookup(template_id) else {
            warn!(template_id, "instantiate_template_not_found");
            return None;
        };
        let pooled = entry.pooled;
        let mut instance = self.pool.acquire(catalog, template_id)?;
        instance.set_placement(placement);
        let id = instance.id();
        self.active.insert(
            id,
            ActiveInstanceRecord {
                instance,
                pooled,
                created_at: now,
                last_access: now,
            },
        );
        self.spawned_this_frame = self.spawned_this_frame.saturating_add(1);
        Some(id)
    }
}
