//! Type-keyed command and query buses.
//!
//! Every command or query type has exactly one handler. Commands that are
//! also [`Job`]s can be routed to a [`JobQueue`]; the worker draining that
//! queue runs the same handler through [`CommandProcessor`].

use async_trait::async_trait;
use messaging::{Job, JobQueue, ProcessingError, Processor};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::debug;

use crate::error::{UserError, UserResult};

pub trait Command: Send + 'static {
    type Output: Send + 'static;
}

pub trait Query: Send + 'static {
    type Output: Send + 'static;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> UserResult<C::Output>;
}

#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q) -> UserResult<Q::Output>;
}

type Registry = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

fn insert_once<T: 'static>(registry: &mut Registry, value: Box<dyn Any + Send + Sync>) -> UserResult<()> {
    match registry.entry(TypeId::of::<T>()) {
        Entry::Occupied(_) => Err(UserError::Internal(format!(
            "Handler already registered for {}",
            type_name::<T>()
        ))),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

fn missing<T>() -> UserError {
    UserError::Internal(format!("No handler registered for {}", type_name::<T>()))
}

#[derive(Default)]
pub struct CommandBus {
    handlers: Registry,
    queues: Registry,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Command>(&mut self, handler: Arc<dyn CommandHandler<C>>) -> UserResult<()> {
        insert_once::<C>(&mut self.handlers, Box::new(handler))
    }

    /// Sends future [`CommandBus::dispatch_async`] calls for `C` to `queue`.
    pub fn route_async<C>(&mut self, queue: JobQueue<C>)
    where
        C: Command<Output = ()> + Job,
    {
        self.queues.insert(TypeId::of::<C>(), Box::new(queue));
    }

    pub fn handler<C: Command>(&self) -> UserResult<Arc<dyn CommandHandler<C>>> {
        self.handlers
            .get(&TypeId::of::<C>())
            .and_then(|h| h.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
            .ok_or_else(missing::<C>)
    }

    pub async fn dispatch<C: Command>(&self, command: C) -> UserResult<C::Output> {
        debug!(command = type_name::<C>(), "Dispatching command");
        self.handler::<C>()?.handle(command).await
    }

    /// Queues the command when a queue is routed for it, otherwise runs it inline.
    pub async fn dispatch_async<C>(&self, command: C) -> UserResult<()>
    where
        C: Command<Output = ()> + Job,
    {
        let queue = self
            .queues
            .get(&TypeId::of::<C>())
            .and_then(|q| q.downcast_ref::<JobQueue<C>>());

        match queue {
            Some(queue) => queue
                .enqueue(command)
                .await
                .map_err(|e| UserError::Internal(e.to_string())),
            None => self.dispatch(command).await,
        }
    }
}

#[derive(Default)]
pub struct QueryBus {
    handlers: Registry,
}

impl QueryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<Q: Query>(&mut self, handler: Arc<dyn QueryHandler<Q>>) -> UserResult<()> {
        insert_once::<Q>(&mut self.handlers, Box::new(handler))
    }

    pub async fn ask<Q: Query>(&self, query: Q) -> UserResult<Q::Output> {
        let handler = self
            .handlers
            .get(&TypeId::of::<Q>())
            .and_then(|h| h.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .cloned()
            .ok_or_else(missing::<Q>)?;

        debug!(query = type_name::<Q>(), "Dispatching query");
        handler.handle(query).await
    }
}

/// Worker-side adapter running queued commands through their handler.
pub struct CommandProcessor<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
    name: &'static str,
}

impl<C: Command> CommandProcessor<C> {
    pub fn new(handler: Arc<dyn CommandHandler<C>>, name: &'static str) -> Self {
        Self { handler, name }
    }
}

#[async_trait]
impl<C> Processor<C> for CommandProcessor<C>
where
    C: Command<Output = ()> + Job,
{
    async fn process(&self, job: &C) -> Result<(), ProcessingError> {
        self.handler.handle(job.clone()).await.map_err(|e| {
            if e.is_transient() {
                ProcessingError::transient(e.to_string())
            } else {
                ProcessingError::permanent(e.to_string())
            }
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::{LocalWorker, WorkerConfig};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Double(u32);

    impl Command for Double {
        type Output = u32;
    }

    struct Doubler;

    #[async_trait]
    impl CommandHandler<Double> for Doubler {
        async fn handle(&self, command: Double) -> UserResult<u32> {
            Ok(command.0 * 2)
        }
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct Tick {
        retry_count: u32,
    }

    impl Command for Tick {
        type Output = ();
    }

    impl Job for Tick {
        fn job_id(&self) -> String {
            "tick".to_string()
        }

        fn retry_count(&self) -> u32 {
            self.retry_count
        }

        fn with_retry(&self) -> Self {
            Self {
                retry_count: self.retry_count + 1,
            }
        }
    }

    #[derive(Default)]
    struct Counter(AtomicU32);

    #[async_trait]
    impl CommandHandler<Tick> for Counter {
        async fn handle(&self, _command: Tick) -> UserResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Count;

    impl Query for Count {
        type Output = usize;
    }

    struct Fixed;

    #[async_trait]
    impl QueryHandler<Count> for Fixed {
        async fn handle(&self, _query: Count) -> UserResult<usize> {
            Ok(42)
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_single_handler() {
        let mut bus = CommandBus::new();
        bus.register::<Double>(Arc::new(Doubler)).unwrap();

        assert_eq!(bus.dispatch(Double(21)).await.unwrap(), 42);
        assert!(bus.register::<Double>(Arc::new(Doubler)).is_err());
    }

    #[tokio::test]
    async fn test_unregistered_command_fails() {
        let bus = CommandBus::new();
        let err = bus.dispatch(Double(1)).await.unwrap_err();
        assert!(matches!(err, UserError::Internal(_)));
    }

    #[tokio::test]
    async fn test_async_dispatch_runs_inline_without_queue() {
        let counter = Arc::new(Counter::default());
        let mut bus = CommandBus::new();
        bus.register::<Tick>(counter.clone()).unwrap();

        bus.dispatch_async(Tick { retry_count: 0 }).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_dispatch_goes_through_worker() {
        let counter = Arc::new(Counter::default());
        let mut bus = CommandBus::new();
        bus.register::<Tick>(counter.clone()).unwrap();

        let processor = CommandProcessor::new(bus.handler::<Tick>().unwrap(), "tick");
        let (queue, worker) = LocalWorker::spawn(WorkerConfig::new("tick"), processor);
        bus.route_async(queue);

        bus.dispatch_async(Tick { retry_count: 0 }).await.unwrap();
        bus.dispatch_async(Tick { retry_count: 0 }).await.unwrap();
        worker.shutdown().await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_bus() {
        let mut bus = QueryBus::new();
        bus.register::<Count>(Arc::new(Fixed)).unwrap();
        assert_eq!(bus.ask(Count).await.unwrap(), 42);
    }
}
