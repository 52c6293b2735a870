//! Persistent voice-rendering worker pool.
//!
//! Workers are spawned once when the renderer is built and live until it is
//! dropped. Per block, the renderer moves each voice's [`VoiceState`] into a
//! [`Task`] and sends it over a bounded crossbeam channel; a worker renders
//! it and sends the task back. Ownership moves with the task, so no buffer
//! is ever shared between threads, and the preallocated channel slots mean
//! the hand-off never allocates.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::voice::{BlockParams, VoiceJob, VoiceState};
use crate::{Error, Result};

/// How the renderer synthesizes voices within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStrategy {
    /// Render every voice on the audio thread, one after another.
    #[default]
    Sequential,
    /// Fan voices out to a fixed pool of worker threads.
    Pool {
        /// Number of worker threads (at least 1)
        workers: usize,
    },
}

/// One voice's worth of work, travelling to a worker and back.
pub(crate) struct Task {
    pub(crate) job: VoiceJob,
    pub(crate) params: BlockParams,
    pub(crate) voice: VoiceState,
}

pub(crate) struct VoicePool {
    jobs: Option<Sender<Task>>,
    done: Receiver<Task>,
    handles: Vec<JoinHandle<()>>,
}

impl VoicePool {
    /// Spawn `workers` threads sharing queues of `capacity` tasks.
    pub(crate) fn new(workers: usize, capacity: usize) -> Result<Self> {
        let (job_tx, job_rx) = bounded::<Task>(capacity);
        let (done_tx, done_rx) = bounded::<Task>(capacity);

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers.max(1) {
            let jobs = job_rx.clone();
            let done = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("polyvox-voice-{index}"))
                .spawn(move || worker_loop(index, &jobs, &done))
                .map_err(Error::WorkerSpawn)?;
            handles.push(handle);
        }
        tracing::debug!(workers = handles.len(), capacity, "voice pool started");

        Ok(Self {
            jobs: Some(job_tx),
            done: done_rx,
            handles,
        })
    }

    /// Hand a task to the workers. Gives it back if the queue cannot take it.
    pub(crate) fn submit(&self, task: Task) -> std::result::Result<(), Task> {
        match &self.jobs {
            Some(jobs) => jobs.try_send(task).map_err(TrySendError::into_inner),
            None => Err(task),
        }
    }

    /// Wait up to `timeout` for the next finished task.
    ///
    /// `None` means nothing finished in time or every worker is gone.
    pub(crate) fn collect(&self, timeout: Duration) -> Option<Task> {
        self.done.recv_timeout(timeout).ok()
    }

    /// Take a finished task if one is already waiting.
    pub(crate) fn try_collect(&self) -> Option<Task> {
        self.done.try_recv().ok()
    }

    pub(crate) fn workers(&self) -> usize {
        self.handles.len()
    }

    #[cfg(test)]
    pub(crate) fn finished(&self) -> usize {
        self.done.len()
    }
}

impl Drop for VoicePool {
    fn drop(&mut self) {
        // Closing the job queue ends every worker loop.
        self.jobs = None;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("voice worker panicked");
            }
        }
        tracing::debug!("voice pool stopped");
    }
}

fn worker_loop(index: usize, jobs: &Receiver<Task>, done: &Sender<Task>) {
    tracing::debug!(worker = index, "voice worker running");
    for mut task in jobs {
        task.voice.render(&task.job, &task.params);
        if done.send(task).is_err() {
            break;
        }
    }
}
