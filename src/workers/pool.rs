//! # Pool de Workers de Tamaño Fijo
//! src/workers/pool.rs
//!
//! Un conjunto fijo de threads de larga vida que consumen tareas de una
//! cola FIFO compartida.
//!
//! ## Sincronización
//!
//! La cola y la bandera `accepting` viven bajo un único `Mutex`. Los workers
//! duermen en un `Condvar` mientras la cola está vacía y el pool sigue
//! aceptando trabajo; nunca hacen polling.
//!
//! ```text
//! submit() ──► [ t0 | t1 | t2 | ... ] ──► worker-0
//!                                     ──► worker-1
//!                                     ──► worker-N
//! ```
//!
//! ## Apagado
//!
//! 1. `close()`: deja de aceptar tareas y despierta a todos los workers.
//! 2. Los workers siguen drenando la cola; cada uno sale cuando la ve vacía.
//! 3. `Drop` / `shutdown()`: espera (join) a que todos terminen.
//!
//! Una tarea que nunca termina ocupa su worker para siempre. El pool no
//! impone timeouts.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Unidad de trabajo: sin argumentos, sin valor de retorno
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errores del pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// El pool ya no acepta tareas
    #[error("worker pool is closed")]
    Closed,

    /// Se pidió un pool sin workers
    #[error("worker pool needs at least one worker")]
    ZeroWorkers,

    /// El sistema operativo no pudo crear un thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Número de secuencia de una tarea aceptada (orden FIFO de la cola)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Foto de los contadores del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub pending: usize,
    pub completed: usize,
    pub panicked: usize,
}

/// Estado protegido por el mutex
struct QueueState {
    tasks: VecDeque<Task>,
    accepting: bool,
    next_id: u64,
}

/// Estado compartido entre el pool y sus workers
struct Shared {
    state: Mutex<QueueState>,

    /// Se notifica cuando llega una tarea o cuando el pool se cierra
    available: Condvar,

    // Solo para reportes, no participan en la condición de salida
    completed: AtomicUsize,
    panicked: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                accepting: true,
                next_id: 0,
            }),
            available: Condvar::new(),
            completed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        }
    }

    /// Bloquea hasta que haya una tarea o hasta que el pool esté cerrado
    ///
    /// Retorna `None` solo cuando el pool está cerrado y la cola vacía.
    fn next_task(&self) -> Option<Task> {
        let mut state = self.state.lock();

        while state.accepting && state.tasks.is_empty() {
            self.available.wait(&mut state);
        }

        state.tasks.pop_front()
    }
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: usize, shared: Arc<Shared>) -> Result<Self, PoolError> {
        let handle = thread::Builder::new()
            .name(format!("pool-worker-{}", id))
            .spawn(move || worker_loop(id, &shared))
            .map_err(PoolError::Spawn)?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }
}

/// Loop principal del worker
fn worker_loop(id: usize, shared: &Shared) {
    debug!(worker = id, "worker started");

    while let Some(task) = shared.next_task() {
        // El lock ya se liberó: otros workers pueden tomar tareas en paralelo
        match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                error!(
                    worker = id,
                    panic = %panic_message(&*payload),
                    "task panicked, worker keeps running"
                );
            }
        }
    }

    debug!(worker = id, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Pool de workers con cola FIFO compartida
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Crea el pool e inicia `size` workers de inmediato
    ///
    /// Si algún thread no se puede crear, los que ya arrancaron se detienen
    /// y se retorna `PoolError::Spawn`.
    ///
    /// # Ejemplo
    /// ```
    /// use pool_server::workers::WorkerPool;
    ///
    /// let pool = WorkerPool::new(4).unwrap();
    /// pool.submit(|| println!("hola desde un worker")).unwrap();
    /// // Al salir de scope el pool drena la cola y espera a sus workers
    /// ```
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroWorkers);
        }

        let mut pool = Self {
            shared: Arc::new(Shared::new()),
            workers: Vec::with_capacity(size),
        };

        for id in 0..size {
            // En caso de error, `Drop` cierra y hace join de los ya creados
            let worker = Worker::spawn(id, Arc::clone(&pool.shared))?;
            pool.workers.push(worker);
        }

        debug!(workers = size, "worker pool ready");
        Ok(pool)
    }

    /// Encola una tarea al final de la cola y despierta a un worker
    ///
    /// Retorna `PoolError::Closed` si el pool ya empezó a apagarse; en ese
    /// caso la tarea se descarta sin ejecutarse.
    pub fn submit<F>(&self, task: F) -> Result<TaskId, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = {
            let mut state = self.shared.state.lock();
            if !state.accepting {
                return Err(PoolError::Closed);
            }

            let id = TaskId(state.next_id);
            state.next_id += 1;
            state.tasks.push_back(Box::new(task));
            id
        };

        self.shared.available.notify_one();
        Ok(id)
    }

    /// Deja de aceptar tareas y despierta a todos los workers
    ///
    /// No espera: las tareas pendientes se siguen ejecutando. Llamarlo más
    /// de una vez no tiene efecto.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.lock();
            state.accepting = false;
        }

        // Cada worker debe revisar por su cuenta la condición de salida
        self.shared.available.notify_all();
    }

    /// Cierra el pool, drena la cola y espera a todos los workers
    pub fn shutdown(mut self) -> PoolStats {
        self.join_workers();
        self.stats()
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.state.lock().accepting
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers.len(),
            pending: self.pending(),
            completed: self.shared.completed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }

    fn join_workers(&mut self) {
        self.close();

        let mut joined = 0;
        for worker in &mut self.workers {
            let Some(handle) = worker.handle.take() else {
                continue;
            };

            // El último dueño del pool puede ser una tarea en un worker
            if handle.thread().id() == thread::current().id() {
                warn!(worker = worker.id, "pool dropped from its own worker, not joining it");
                continue;
            }

            if handle.join().is_err() {
                warn!(worker = worker.id, "worker thread panicked");
            }
            joined += 1;
        }

        if joined > 0 {
            info!(
                workers = joined,
                completed = self.shared.completed.load(Ordering::Relaxed),
                panicked = self.shared.panicked.load(Ordering::Relaxed),
                "all pool workers stopped"
            );
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join_workers();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerPool::new(0);
        assert!(matches!(result, Err(PoolError::ZeroWorkers)));
    }

    #[test]
    fn test_pool_size() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.size(), 3);
        assert!(pool.is_accepting());
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_each_task_runs_exactly_once() {
        for workers in [1, 2, 4, 8] {
            let counts: Arc<Vec<AtomicUsize>> =
                Arc::new((0..200).map(|_| AtomicUsize::new(0)).collect());

            let pool = WorkerPool::new(workers).unwrap();
            for i in 0..200 {
                let counts = Arc::clone(&counts);
                pool.submit(move || {
                    counts[i].fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
            let stats = pool.shutdown();

            assert_eq!(stats.completed, 200);
            for (i, count) in counts.iter().enumerate() {
                assert_eq!(count.load(Ordering::SeqCst), 1, "task {} with {} workers", i, workers);
            }
        }
    }

    #[test]
    fn test_fifo_start_order_single_worker() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(1).unwrap();

        for i in 0..50 {
            let order = Arc::clone(&order);
            pool.submit(move || order.lock().push(i)).unwrap();
        }
        drop(pool);

        let order = order.lock();
        assert_eq!(*order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_task_ids_follow_submission_order() {
        let pool = WorkerPool::new(2).unwrap();

        let ids: Vec<TaskId> = (0..10).map(|_| pool.submit(|| {}).unwrap()).collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0].as_u64(), 0);
        assert_eq!(ids[9].to_string(), "task-9");
    }

    #[test]
    fn test_drop_drains_queue() {
        let done = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2).unwrap();

        for _ in 0..12 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(10));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        drop(pool);

        // Más tareas que workers: el drop tuvo que esperar a todas
        assert_eq!(done.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_four_workers_ten_tasks() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(4).unwrap();

        for i in 0..10 {
            let results = Arc::clone(&results);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(20));
                results.lock().push(i);
            })
            .unwrap();
        }
        let stats = pool.shutdown();

        let mut results = results.lock().clone();
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_submit_after_close_rejected() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2).unwrap();

        pool.close();
        assert!(!pool.is_accepting());

        let ran_clone = Arc::clone(&ran);
        let result = pool.submit(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(result, Err(PoolError::Closed)));

        drop(pool);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_close_is_idempotent_and_still_drains() {
        let done = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(1).unwrap();

        for _ in 0..5 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(5));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.close();
        pool.close();

        let stats = pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert_eq!(stats.completed, 5);
    }

    #[test]
    fn test_panicking_task_is_isolated() {
        let done = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2).unwrap();

        for i in 0..10 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                if i == 4 {
                    panic!("boom");
                }
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        // El pool sigue aceptando trabajo después del panic
        let done_late = Arc::clone(&done);
        pool.submit(move || {
            done_late.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let stats = pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 10);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 10);
    }

    #[test]
    fn test_every_worker_survives_panics() {
        let pool = WorkerPool::new(2).unwrap();

        for _ in 0..6 {
            pool.submit(|| panic!("each worker hits at least one")).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        for i in 0..4 {
            let tx = tx.clone();
            pool.submit(move || tx.send(i).unwrap()).unwrap();
        }
        drop(tx);

        let mut got: Vec<i32> = rx.iter().collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2, 3]);

        let stats = pool.shutdown();
        assert_eq!(stats.panicked, 6);
    }

    #[test]
    fn test_long_task_blocks_only_its_worker() {
        let pool = WorkerPool::new(2).unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        pool.submit(move || {
            let _ = release_rx.recv();
        })
        .unwrap();

        for i in 0..5 {
            let done_tx = done_tx.clone();
            pool.submit(move || done_tx.send(i).unwrap()).unwrap();
        }

        for _ in 0..5 {
            done_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("the free worker should run the short tasks");
        }

        release_tx.send(()).unwrap();
        let stats = pool.shutdown();
        assert_eq!(stats.completed, 6);
    }

    #[test]
    fn test_concurrent_submitters() {
        let counts: Arc<Vec<AtomicUsize>> =
            Arc::new((0..400).map(|_| AtomicUsize::new(0)).collect());
        let pool = Arc::new(WorkerPool::new(4).unwrap());

        let submitters: Vec<_> = (0..4)
            .map(|s| {
                let pool = Arc::clone(&pool);
                let counts = Arc::clone(&counts);
                thread::spawn(move || {
                    for i in 0..100 {
                        let counts = Arc::clone(&counts);
                        let slot = s * 100 + i;
                        pool.submit(move || {
                            counts[slot].fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for submitter in submitters {
            submitter.join().unwrap();
        }

        let pool = Arc::try_unwrap(pool).expect("submitters released the pool");
        let stats = pool.shutdown();

        assert_eq!(stats.completed, 400);
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_close_races_with_submit() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(WorkerPool::new(2).unwrap());

        let submitter = {
            let pool = Arc::clone(&pool);
            let ran = Arc::clone(&ran);
            thread::spawn(move || {
                let mut accepted = 0;
                for _ in 0..1_000 {
                    let ran = Arc::clone(&ran);
                    match pool.submit(move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                    }) {
                        Ok(_) => accepted += 1,
                        Err(PoolError::Closed) => break,
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
                accepted
            })
        };

        pool.close();
        let accepted = submitter.join().unwrap();

        let pool = Arc::try_unwrap(pool).expect("submitter released the pool");
        pool.shutdown();

        // Todo lo aceptado corrió; nada rechazado corrió
        assert_eq!(ran.load(Ordering::SeqCst), accepted);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*payload), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
