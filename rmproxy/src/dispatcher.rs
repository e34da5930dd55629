//! The dispatcher: a single worker thread that owns the registry and
//! serializes every device exchange system-wide.
//!
//! Producers (the HTTP handlers) enqueue onto a bounded channel and block
//! when it fills up; the worker drains it strictly in order. Operations
//! that need an answer carry a oneshot reply channel.

use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use broadlink_client::{ClientError, Registry};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::message::{Instruction, Message};

/// Queue capacity; producers block once this many commands are pending.
pub const QUEUE_DEPTH: usize = 20;

/// A work item on the dispatcher queue.
#[derive(Debug)]
pub enum Command {
    /// A fire-and-forget instruction sequence, executed atomically.
    Message(Message),
    /// Learn an IR code on a device and report the hex capture back.
    LearnIr {
        device: String,
        reply: oneshot::Sender<Result<String, ClientError>>,
    },
    /// Sweep and learn an RF code on a device.
    LearnRf {
        device: String,
        reply: oneshot::Sender<Result<String, ClientError>>,
    },
    /// Query a power outlet's state.
    QueryPower {
        device: String,
        reply: oneshot::Sender<Result<bool, ClientError>>,
    },
}

/// Handle to the worker thread and its queue.
pub struct Dispatcher {
    queue: mpsc::Sender<Command>,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    /// Move the registry into a fresh worker thread and start consuming.
    pub fn spawn(registry: Registry) -> Self {
        let (queue, rx) = mpsc::channel(QUEUE_DEPTH);
        let worker = thread::spawn(move || run(registry, rx));
        Self { queue, worker }
    }

    /// A producer handle onto the queue.
    pub fn sender(&self) -> mpsc::Sender<Command> {
        self.queue.clone()
    }

    /// Enqueue the shutdown message, let the worker drain everything ahead
    /// of it, and wait for the thread to exit.
    pub async fn shutdown(self) {
        let Self { queue, worker } = self;
        if queue
            .send(Command::Message(Message::shutdown()))
            .await
            .is_err()
        {
            debug!("dispatcher queue already closed");
        }
        drop(queue);
        let joined = tokio::task::spawn_blocking(move || worker.join()).await;
        match joined {
            Ok(Ok(())) => {}
            _ => error!("dispatcher worker did not shut down cleanly"),
        }
    }
}

fn run(mut registry: Registry, mut queue: mpsc::Receiver<Command>) {
    info!("dispatcher started");
    while let Some(command) = queue.blocking_recv() {
        match command {
            Command::Message(message) => {
                if run_message(&mut registry, message).is_break() {
                    break;
                }
            }
            Command::LearnIr { device, reply } => {
                debug!("learn {device}");
                let _ = reply.send(registry.learn_ir(&device));
            }
            Command::LearnRf { device, reply } => {
                debug!("learn RF {device}");
                let _ = reply.send(registry.learn_rf(&device));
            }
            Command::QueryPower { device, reply } => {
                debug!("query {device}");
                let _ = reply.send(registry.power_state(&device));
            }
        }
    }
    info!("dispatcher terminated");
}

fn run_message(registry: &mut Registry, message: Message) -> ControlFlow<()> {
    for instruction in message {
        match instruction {
            Instruction::SendCode { target, data } => {
                if let Err(e) = registry.execute(&target, &data) {
                    error!("error executing command: {e}");
                }
            }
            Instruction::Pause { ms } => thread::sleep(Duration::from_millis(ms)),
            Instruction::Shutdown => return ControlFlow::Break(()),
        }
    }
    ControlFlow::Continue(())
}
