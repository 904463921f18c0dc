//! # Notification Dispatcher
//!
//! Hands model events to evaluators and returns them, in submission order,
//! to the document thread.
//!
//! In background mode a single worker thread owns the evaluators and reads
//! jobs from one FIFO channel; evaluated events come back on a second FIFO
//! channel. One consumer on each side keeps completions in the order the
//! operations were applied. Inline mode runs evaluators during `submit` and
//! is used by tools that need deterministic single-threaded behaviour.

use crate::event::ModelEvent;
use std::collections::VecDeque;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

/// Reads model events to recompute derived values. Never sees the live model.
pub trait Evaluator: Send {
    fn evaluate(&mut self, event: &ModelEvent);
}

impl<F> Evaluator for F
where
    F: FnMut(&ModelEvent) + Send,
{
    fn evaluate(&mut self, event: &ModelEvent) {
        self(event)
    }
}

enum Job {
    Evaluate(ModelEvent),
    Register(Box<dyn Evaluator>),
}

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    completed: mpsc::Receiver<ModelEvent>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (done_tx, done_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("tenniarb-dispatch".to_string())
            .spawn(move || {
                let mut evaluators: Vec<Box<dyn Evaluator>> = Vec::new();
                for job in job_rx {
                    match job {
                        Job::Register(evaluator) => evaluators.push(evaluator),
                        Job::Evaluate(event) => {
                            tracing::trace!(
                                sequence = event.sequence,
                                evaluators = evaluators.len(),
                                "evaluating event"
                            );
                            for evaluator in evaluators.iter_mut() {
                                evaluator.evaluate(&event);
                            }
                            if done_tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
                tracing::trace!("dispatcher worker stopped");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            completed: done_rx,
            thread: Some(thread),
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

pub struct Dispatcher {
    worker: Option<Worker>,
    /// Evaluators run inline when there is no worker
    evaluators: Vec<Box<dyn Evaluator>>,
    /// Events done without going through the worker
    completed: VecDeque<ModelEvent>,
    /// Events sent to the worker and not yet received back
    in_flight: usize,
}

impl Dispatcher {
    pub fn inline() -> Self {
        Self {
            worker: None,
            evaluators: Vec::new(),
            completed: VecDeque::new(),
            in_flight: 0,
        }
    }

    pub fn background() -> std::io::Result<Self> {
        Ok(Self {
            worker: Some(Worker::spawn()?),
            ..Self::inline()
        })
    }

    /// Background dispatcher when asked for and the thread can be started,
    /// inline otherwise
    pub fn new(background: bool) -> Self {
        if !background {
            return Self::inline();
        }
        match Self::background() {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                tracing::warn!("cannot start dispatcher thread, evaluating inline: {}", err);
                Self::inline()
            }
        }
    }

    pub fn is_background(&self) -> bool {
        self.worker.is_some()
    }

    /// Add an evaluator. It sees every event submitted after this call.
    pub fn register(&mut self, evaluator: Box<dyn Evaluator>) {
        let Some(jobs) = self.worker.as_ref().and_then(|w| w.jobs.as_ref()) else {
            self.evaluators.push(evaluator);
            return;
        };
        if let Err(mpsc::SendError(job)) = jobs.send(Job::Register(evaluator)) {
            tracing::warn!("dispatcher worker is gone, evaluator runs inline");
            if let Job::Register(evaluator) = job {
                self.evaluators.push(evaluator);
            }
        }
    }

    pub fn submit(&mut self, event: ModelEvent) {
        tracing::trace!(sequence = event.sequence, "event submitted");
        let event = match self.worker.as_ref().and_then(|w| w.jobs.as_ref()) {
            Some(jobs) => match jobs.send(Job::Evaluate(event)) {
                Ok(()) => {
                    self.in_flight += 1;
                    return;
                }
                Err(mpsc::SendError(job)) => {
                    tracing::warn!("dispatcher worker is gone, event not evaluated");
                    match job {
                        Job::Evaluate(event) => event,
                        Job::Register(_) => return,
                    }
                }
            },
            None => {
                for evaluator in self.evaluators.iter_mut() {
                    evaluator.evaluate(&event);
                }
                event
            }
        };
        self.completed.push_back(event);
    }

    /// Next evaluated event if one is ready
    pub fn try_completed(&mut self) -> Option<ModelEvent> {
        if let Some(worker) = &self.worker {
            match worker.completed.try_recv() {
                Ok(event) => {
                    self.in_flight -= 1;
                    return Some(event);
                }
                // Anything queued locally was submitted after what is in flight.
                Err(TryRecvError::Empty) if self.in_flight > 0 => return None,
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.worker_lost(),
            }
        }
        self.completed.pop_front()
    }

    /// Next evaluated event, waiting for the worker when events are in flight
    pub fn wait_completed(&mut self) -> Option<ModelEvent> {
        if let Some(worker) = &self.worker {
            if self.in_flight > 0 {
                match worker.completed.recv() {
                    Ok(event) => {
                        self.in_flight -= 1;
                        return Some(event);
                    }
                    Err(_) => self.worker_lost(),
                }
            }
        }
        self.completed.pop_front()
    }

    fn worker_lost(&mut self) {
        if self.in_flight > 0 {
            tracing::warn!(lost = self.in_flight, "dispatcher worker stopped with events in flight");
        }
        self.in_flight = 0;
    }

    /// Events submitted and not yet taken back
    pub fn pending(&self) -> usize {
        self.in_flight + self.completed.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::inline()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("background", &self.is_background())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ModelEventKind;
    use crate::model::Model;
    use std::sync::{Arc, Mutex};

    fn event(sequence: u64) -> ModelEvent {
        let mut event = ModelEvent::new(ModelEventKind::Structure, Model::new().root());
        event.sequence = sequence;
        event
    }

    fn drain(dispatcher: &mut Dispatcher) -> Vec<u64> {
        let mut seen = Vec::new();
        while let Some(event) = dispatcher.wait_completed() {
            seen.push(event.sequence);
        }
        seen
    }

    #[test]
    fn test_inline_runs_during_submit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::inline();
        let sink = Arc::clone(&seen);
        dispatcher.register(Box::new(move |e: &ModelEvent| sink.lock().unwrap().push(e.sequence)));

        dispatcher.submit(event(1));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(dispatcher.pending(), 1);
        assert_eq!(dispatcher.try_completed().map(|e| e.sequence), Some(1));
        assert!(dispatcher.try_completed().is_none());
    }

    #[test]
    fn test_background_preserves_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::background().unwrap();
        let sink = Arc::clone(&seen);
        dispatcher.register(Box::new(move |e: &ModelEvent| sink.lock().unwrap().push(e.sequence)));

        for sequence in 1..=50 {
            dispatcher.submit(event(sequence));
        }
        let completed = drain(&mut dispatcher);
        let expected: Vec<u64> = (1..=50).collect();
        assert_eq!(completed, expected);
        assert_eq!(*seen.lock().unwrap(), expected);
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_evaluator_registered_later_sees_later_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::background().unwrap();
        dispatcher.submit(event(1));
        let sink = Arc::clone(&seen);
        dispatcher.register(Box::new(move |e: &ModelEvent| sink.lock().unwrap().push(e.sequence)));
        dispatcher.submit(event(2));

        assert_eq!(drain(&mut dispatcher), vec![1, 2]);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_new_falls_back_to_inline() {
        assert!(!Dispatcher::new(false).is_background());
        assert!(Dispatcher::new(true).is_background());
    }
}
