use std::{collections::HashSet, panic::{catch_unwind, AssertUnwindSafe}, sync::{Condvar, Mutex, MutexGuard, PoisonError}, time::Instant};
use crossbeam::channel::{Receiver, Sender};
use crate::core::{*, codes::*};
use super::{command::Command, registry::{Burial, EventObj, Object, Registry}};

/// A command whose dependencies are all terminal
pub(super) struct Job {
    event: Handle,
    command: Option<Command>,
    failed: bool,
}

pub(super) enum Message {
    Run (Job),
    Stop,
}

/// State shared between the backend and its workers
pub(super) struct Shared {
    registry: Mutex<Registry>,
    cond: Condvar,
    epoch: Instant,
    sender: Sender<Message>,
}

impl Shared {
    pub fn new (registry: Registry, sender: Sender<Message>) -> Self {
        Self {
            registry: Mutex::new(registry),
            cond: Condvar::new(),
            epoch: Instant::now(),
            sender
        }
    }

    #[inline]
    pub fn lock (&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Nanoseconds since the backend started
    #[inline]
    pub fn now (&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn stop (&self, workers: usize) {
        for _ in 0..workers {
            if self.sender.send(Message::Stop).is_err() {
                break
            }
        }
    }

    /// Submits every command still queued, and stops the workers once none of them is pending.
    /// Called when the backend is dropped, possibly from one of its own workers, so it never blocks.
    pub fn shutdown (&self, workers: usize) {
        let mut reg = self.lock();
        let mut ready = Vec::new();
        let now = self.now();

        for queue in reg.queues() {
            if let Err(code) = flush_queue(&mut reg, queue, now, &mut ready) {
                tracing::warn!(queue = queue.as_usize(), code, "failed to flush queue on shutdown");
            }
        }
        self.send(ready);

        match reg.pending {
            0 => self.stop(workers),
            pending => {
                tracing::debug!(pending, "host backend dropped, draining pending commands");
                reg.stopping = Some(workers);
            }
        }
    }

    fn send (&self, ready: Vec<Job>) {
        for job in ready {
            if self.sender.send(Message::Run(job)).is_err() {
                tracing::error!("host workers are gone, dropping command");
            }
        }
    }

    /// Releases one reference. Command queues are flushed first, so that their pending commands can
    /// eventually let go of them.
    pub fn release (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        let mut graveyard = Vec::new();
        let result = {
            let mut reg = self.lock();
            if kind == ObjectKind::CommandQueue && reg.queue(handle).is_ok() {
                self.flush_locked(&mut reg, handle)?;
            }
            reg.release(kind, handle, &mut graveyard)
        };

        graveyard.into_iter().for_each(Burial::bury);
        result
    }

    /// Records a validated command on `queue`, returning its event with two references: the
    /// caller's and the one held until the command is terminal.
    pub fn enqueue (&self, reg: &mut Registry, queue: Handle, command_type: u32, wait: &[Handle], command: Command, mut held: Vec<(ObjectKind, Handle)>) -> NativeResult<Handle> {
        let q = reg.queue(queue)?;
        let (context, props) = (q.context, q.props);

        let implicit = if command_type == CL_COMMAND_MARKER && wait.is_empty() {
            q.outstanding.iter().copied().collect()
        } else if props.out_of_order() {
            Vec::new()
        } else {
            q.last.into_iter().collect()
        };

        held.push((ObjectKind::CommandQueue, queue));
        held.extend(wait.iter().map(|x| (ObjectKind::Event, *x)));
        for (kind, handle) in &held {
            reg.retain(*kind, *handle)?;
        }

        let event = reg.insert(Object::Event(EventObj {
            context,
            queue,
            command_type,
            status: CL_QUEUED,
            profiling: props.profiling(),
            times: [self.now(), 0, 0, 0],
            callbacks: Vec::new(),
            deps: wait.to_vec(),
            implicit,
            dependents: Vec::new(),
            remaining: 0,
            dep_failed: false,
            command: Some(command),
            held
        }), 2);

        reg.pending += 1;
        let q = reg.queue_mut(queue)?;
        q.unflushed.push(event);
        q.outstanding.insert(event);
        if !props.out_of_order() {
            q.last = Some(event);
        }

        tracing::trace!(event = event.as_usize(), queue = queue.as_usize(), command_type, "command queued");
        Ok(event)
    }

    pub fn flush (&self, queue: Handle) -> NativeResult<()> {
        let mut reg = self.lock();
        self.flush_locked(&mut reg, queue)
    }

    fn flush_locked (&self, reg: &mut Registry, queue: Handle) -> NativeResult<()> {
        let mut ready = Vec::new();
        flush_queue(reg, queue, self.now(), &mut ready)?;
        self.send(ready);
        Ok(())
    }

    /// Flushes and waits for every command enqueued on `queue` so far.
    pub fn finish (&self, queue: Handle) -> NativeResult<()> {
        let mut reg = self.lock();
        let roots = reg.queue(queue)?.outstanding.iter().copied().collect::<Vec<_>>();
        self.flush_locked(&mut reg, queue)?;
        let reg = self.wait_locked(reg, &roots);
        drop(reg);
        Ok(())
    }

    /// Blocks until every event is terminal, failing with `CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST`
    /// if any of them terminated abnormally.
    pub fn wait (&self, events: &[Handle]) -> NativeResult<()> {
        if events.is_empty() {
            return Err(CL_INVALID_VALUE)
        }

        let reg = self.lock();
        let mut context = None;
        for event in events {
            let event = reg.event(*event)?;
            match context {
                Some(x) if x != event.context => return Err(CL_INVALID_CONTEXT),
                _ => context = Some(event.context)
            }
        }

        let reg = self.wait_locked(reg, events);
        match events.iter().any(|x| reg.event(*x).map_or(false, |x| x.status < 0)) {
            true => Err(CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST),
            false => Ok(())
        }
    }

    /// Waits for a command enqueued with `blocking` set. On failure, the caller's reference to the
    /// event is released and the command's status is returned.
    pub fn complete_blocking (&self, event: Handle, blocking: bool) -> NativeResult<Handle> {
        if !blocking {
            return Ok(event)
        }

        let reg = self.wait_locked(self.lock(), &[event]);
        let status = reg.event(event).map_or(CL_COMPLETE, |x| x.status);
        drop(reg);

        if status < 0 {
            self.release(ObjectKind::Event, event)?;
            return Err(status)
        }

        Ok(event)
    }

    /// Flushes every queue the events transitively depend on, then waits for all of them to be terminal.
    fn wait_locked<'a> (&self, mut reg: MutexGuard<'a, Registry>, events: &[Handle]) -> MutexGuard<'a, Registry> {
        let mut ready = Vec::new();
        flush_for(&mut reg, events, self.now(), &mut ready);
        self.send(ready);

        self.cond
            .wait_while(reg, |reg| events.iter().any(|x| reg.event(*x).map_or(false, |x| !x.is_terminal())))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `f`, or runs it right away if the event is already terminal.
    pub fn on_complete (&self, event: Handle, f: EventCallback) -> NativeResult<()> {
        let mut reg = self.lock();
        let e = reg.event_mut(event)?;

        if e.is_terminal() {
            let status = e.status;
            drop(reg);
            run_callback(f, event, status);
            return Ok(())
        }

        e.callbacks.push(f);
        Ok(())
    }

    /// Worker loop
    pub fn work (&self, receiver: Receiver<Message>) {
        for msg in receiver {
            match msg {
                Message::Run(job) => self.run(job),
                Message::Stop => break
            }
        }
    }

    fn run (&self, job: Job) {
        let Job { event, command, failed } = job;

        let status = if failed {
            CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST
        } else if let Some(command) = command {
            self.set_running(event);
            match catch_unwind(AssertUnwindSafe(move || command.execute())) {
                Ok(Ok(())) => CL_COMPLETE,
                Ok(Err(code)) => code,
                Err(_) => {
                    tracing::error!(event = event.as_usize(), "host command panicked");
                    CL_OUT_OF_RESOURCES
                }
            }
        } else {
            CL_COMPLETE
        };

        self.complete(event, status);
    }

    fn set_running (&self, event: Handle) {
        let now = self.now();
        if let Ok(e) = self.lock().event_mut(event) {
            e.status = CL_RUNNING;
            e.times[2] = now;
        }
        tracing::trace!(event = event.as_usize(), "command running");
    }

    /// Moves the event to its terminal `status`, releasing everything the command held and waking
    /// its dependents, waiters and callbacks.
    fn complete (&self, event: Handle, status: i32) {
        let mut graveyard = Vec::new();
        let mut ready = Vec::new();

        let callbacks = {
            let mut reg = self.lock();
            let now = self.now();

            let e = match reg.event_mut(event) {
                Ok(x) => x,
                Err(_) => return
            };

            e.status = status;
            if e.times[2] == 0 {
                e.times[2] = now;
            }
            e.times[3] = now;

            let queue = e.queue;
            let dependents = std::mem::take(&mut e.dependents);
            let held = std::mem::take(&mut e.held);
            let callbacks = std::mem::take(&mut e.callbacks);
            e.deps.clear();
            e.implicit.clear();

            tracing::trace!(event = event.as_usize(), status, "command terminated");

            if let Ok(q) = reg.queue_mut(queue) {
                q.outstanding.remove(&event);
                if q.last == Some(event) {
                    q.last = None;
                }
            }

            for (dependent, explicit) in dependents {
                if let Ok(d) = reg.event_mut(dependent) {
                    d.dep_failed |= explicit && status < 0;
                    d.remaining -= 1;
                    if d.remaining == 0 {
                        ready.push(take_job(d, dependent));
                    }
                }
            }

            for (kind, handle) in held.into_iter().chain(core::iter::once((ObjectKind::Event, event))) {
                if let Err(code) = reg.release(kind, handle, &mut graveyard) {
                    tracing::warn!(?kind, handle = handle.as_usize(), code, "failed to release object held by command");
                }
            }

            self.send(ready);
            reg.pending = reg.pending.saturating_sub(1);
            if reg.pending == 0 {
                if let Some(workers) = reg.stopping.take() {
                    self.stop(workers);
                }
            }

            self.cond.notify_all();
            callbacks
        };

        for f in callbacks {
            run_callback(f, event, status);
        }

        graveyard.into_iter().for_each(Burial::bury);
    }
}

#[inline]
fn run_callback (f: EventCallback, event: Handle, status: i32) {
    if catch_unwind(AssertUnwindSafe(|| f(event, status))).is_err() {
        tracing::error!(event = event.as_usize(), "event callback panicked");
    }
}

#[inline]
fn take_job (e: &mut EventObj, event: Handle) -> Job {
    Job { event, command: e.command.take(), failed: e.dep_failed }
}

/// Submits every unflushed command of `queue`, returning their events.
fn flush_queue (reg: &mut Registry, queue: Handle, now: u64, ready: &mut Vec<Job>) -> NativeResult<Vec<Handle>> {
    let pending = std::mem::take(&mut reg.queue_mut(queue)?.unflushed);
    for event in &pending {
        submit(reg, *event, now, ready);
    }

    if !pending.is_empty() {
        tracing::debug!(queue = queue.as_usize(), commands = pending.len(), "queue flushed");
    }
    Ok(pending)
}

/// Counts the unfinished dependencies of a command, subscribing to each of them.
fn submit (reg: &mut Registry, event: Handle, now: u64, ready: &mut Vec<Job>) {
    let (deps, implicit) = match reg.event_mut(event) {
        Ok(e) => {
            e.status = CL_SUBMITTED;
            e.times[1] = now;
            (e.deps.clone(), e.implicit.clone())
        },
        Err(_) => return
    };

    let mut remaining = 0;
    let mut failed = false;

    let deps = deps.into_iter().map(|x| (x, true)).chain(implicit.into_iter().map(|x| (x, false)));
    for (dep, explicit) in deps {
        if let Ok(d) = reg.event_mut(dep) {
            if !d.is_terminal() {
                d.dependents.push((event, explicit));
                remaining += 1;
            } else if explicit && d.status < 0 {
                failed = true;
            }
        }
    }

    if let Ok(e) = reg.event_mut(event) {
        e.remaining = remaining;
        e.dep_failed |= failed;
        if remaining == 0 {
            ready.push(take_job(e, event));
        }
    }
}

/// Flushes the queues of `roots` and of everything they transitively wait on.
fn flush_for (reg: &mut Registry, roots: &[Handle], now: u64, ready: &mut Vec<Job>) {
    let mut stack = roots.to_vec();
    let mut seen = HashSet::new();

    while let Some(event) = stack.pop() {
        if !seen.insert(event) {
            continue
        }

        let (status, queue, deps) = match reg.event(event) {
            Ok(e) if !e.is_terminal() => (e.status, e.queue, e.deps.iter().chain(&e.implicit).copied().collect::<Vec<_>>()),
            _ => continue
        };

        if status == CL_QUEUED {
            if let Ok(flushed) = flush_queue(reg, queue, now, ready) {
                stack.extend(flushed);
            }
        }
        stack.extend(deps);
    }
}
