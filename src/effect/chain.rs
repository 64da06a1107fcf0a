//! Ordered effect chain with lock-free structural edits.
//!
//! [`effect_chain`] returns two halves. The [`EffectChainHandle`] stays on
//! the control thread and queues edits; the [`EffectChain`] lives on the
//! audio thread, applies queued edits at the start of each period and then
//! runs its effects in order. Effects leaving the chain travel back to the
//! handle through a second queue and are dropped there. The audio thread
//! only frees an effect when that queue overflows, which happens when more
//! effects retire between two [`EffectChainHandle::collect_garbage`] calls
//! than the queue holds.
//!
//! The handle mirrors the chain's layout, so bad indices and a full chain
//! are reported to the caller before anything is queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, warn};

use crate::dsp::mix::sanitize;
use crate::engine::EngineContext;
use crate::error::{Error, Result};
use crate::Frame;

use super::Effect;

pub const DEFAULT_CAPACITY: usize = 32;
const COMMAND_QUEUE_SIZE: usize = 64;

enum ChainCommand {
    Append(Box<dyn Effect>),
    Insert(usize, Box<dyn Effect>),
    Remove(usize),
    MoveUp(usize),
    MoveDown(usize),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetireReason {
    Removed,
    Rejected,
}

struct Retired {
    effect: Box<dyn Effect>,
    reason: RetireReason,
}

/// Create a chain holding at most `capacity` effects.
pub fn effect_chain(capacity: usize) -> (EffectChainHandle, EffectChain) {
    let (commands_tx, commands_rx) = RingBuffer::new(COMMAND_QUEUE_SIZE);
    let (retired_tx, retired_rx) = RingBuffer::new(capacity + COMMAND_QUEUE_SIZE);
    let enabled = Arc::new(AtomicBool::new(true));

    let handle = EffectChainHandle {
        commands: commands_tx,
        retired: retired_rx,
        enabled: Arc::clone(&enabled),
        layout: Vec::with_capacity(capacity),
        capacity,
    };
    let chain = EffectChain {
        effects: Vec::with_capacity(capacity),
        commands: commands_rx,
        retired: retired_tx,
        enabled,
        capacity,
        retire_overflows: 0,
    };
    (handle, chain)
}

/// Control-side half of an effect chain.
pub struct EffectChainHandle {
    commands: Producer<ChainCommand>,
    retired: Consumer<Retired>,
    enabled: Arc<AtomicBool>,
    layout: Vec<&'static str>,
    capacity: usize,
}

impl EffectChainHandle {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Effect names in processing order, as of the last queued edit.
    pub fn layout(&self) -> &[&'static str] {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn append(&mut self, effect: Box<dyn Effect>) -> Result<()> {
        self.check_room()?;
        let name = effect.name();
        self.send(ChainCommand::Append(effect))?;
        self.layout.push(name);
        debug!(effect = name, len = self.layout.len(), "effect appended");
        Ok(())
    }

    pub fn insert(&mut self, index: usize, effect: Box<dyn Effect>) -> Result<()> {
        self.check_room()?;
        if index > self.layout.len() {
            return Err(self.reject(format!(
                "insert at {index} in a chain of {}",
                self.layout.len()
            )));
        }
        let name = effect.name();
        self.send(ChainCommand::Insert(index, effect))?;
        self.layout.insert(index, name);
        debug!(effect = name, index, "effect inserted");
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.send(ChainCommand::Remove(index))?;
        let name = self.layout.remove(index);
        debug!(effect = name, index, "effect removed");
        Ok(())
    }

    /// Swap the effect at `index` with the one before it. The first effect
    /// stays where it is.
    pub fn move_up(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.send(ChainCommand::MoveUp(index))?;
        if index > 0 {
            self.layout.swap(index - 1, index);
        }
        debug!(index, "effect moved up");
        Ok(())
    }

    /// Swap the effect at `index` with the one after it. The last effect
    /// stays where it is.
    pub fn move_down(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.send(ChainCommand::MoveDown(index))?;
        if index + 1 < self.layout.len() {
            self.layout.swap(index, index + 1);
        }
        debug!(index, "effect moved down");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.send(ChainCommand::Clear)?;
        self.layout.clear();
        debug!("effect chain cleared");
        Ok(())
    }

    /// Drop effects the audio thread has handed back. Returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        let mut count = 0;
        while let Ok(retired) = self.retired.pop() {
            if retired.reason == RetireReason::Rejected {
                warn!(effect = retired.effect.name(), "effect chain rejected an edit");
            }
            count += 1;
        }
        if count > 0 {
            debug!(count, "retired effects dropped");
        }
        count
    }

    fn send(&mut self, command: ChainCommand) -> Result<()> {
        match self.commands.push(command) {
            Ok(()) => Ok(()),
            Err(PushError::Full(_)) => {
                warn!("effect chain command queue is full");
                Err(Error::ChainQueueFull)
            }
        }
    }

    fn check_room(&self) -> Result<()> {
        if self.layout.len() >= self.capacity {
            return Err(self.reject(format!("chain is at its capacity of {}", self.capacity)));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.layout.len() {
            return Err(self.reject(format!(
                "index {index} in a chain of {}",
                self.layout.len()
            )));
        }
        Ok(())
    }

    fn reject(&self, reason: String) -> Error {
        warn!(%reason, "effect chain edit rejected");
        Error::ChainEdit(reason)
    }
}

/// Audio-side half of an effect chain.
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    commands: Consumer<ChainCommand>,
    retired: Producer<Retired>,
    enabled: Arc<AtomicBool>,
    capacity: usize,
    retire_overflows: usize,
}

impl EffectChain {
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effect(&self, index: usize) -> Option<&dyn Effect> {
        self.effects.get(index).map(|e| e.as_ref())
    }

    /// Effects that had to be dropped on the audio thread because the
    /// retire queue was full.
    pub fn retire_overflows(&self) -> usize {
        self.retire_overflows
    }

    fn retire(&mut self, effect: Box<dyn Effect>, reason: RetireReason) {
        // Full when the handle is gone or has not collected garbage for a while.
        if let Err(PushError::Full(retired)) = self.retired.push(Retired { effect, reason }) {
            self.retire_overflows += 1;
            warn!(
                effect = retired.effect.name(),
                reason = ?retired.reason,
                "retire queue full, dropping effect on the audio thread"
            );
            drop(retired);
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                ChainCommand::Append(effect) => {
                    if self.effects.len() < self.capacity {
                        self.effects.push(effect);
                    } else {
                        self.retire(effect, RetireReason::Rejected);
                    }
                }
                ChainCommand::Insert(index, effect) => {
                    if self.effects.len() < self.capacity {
                        let index = index.min(self.effects.len());
                        self.effects.insert(index, effect);
                    } else {
                        self.retire(effect, RetireReason::Rejected);
                    }
                }
                ChainCommand::Remove(index) => {
                    if index < self.effects.len() {
                        let effect = self.effects.remove(index);
                        self.retire(effect, RetireReason::Removed);
                    }
                }
                ChainCommand::MoveUp(index) => {
                    if index > 0 && index < self.effects.len() {
                        self.effects.swap(index - 1, index);
                    }
                }
                ChainCommand::MoveDown(index) => {
                    if index + 1 < self.effects.len() {
                        self.effects.swap(index, index + 1);
                    }
                }
                ChainCommand::Clear => {
                    while let Some(effect) = self.effects.pop() {
                        self.retire(effect, RetireReason::Removed);
                    }
                }
            }
        }
    }

    /// Run one period through the chain.
    ///
    /// `has_input` restarts every effect; otherwise only effects whose gate
    /// is still open run. Returns whether any effect is still producing
    /// sound, or `false` straight away when the chain is disabled.
    pub fn process_audio_buffer(
        &mut self,
        ctx: &EngineContext,
        buffer: &mut [Frame],
        has_input: bool,
    ) -> bool {
        self.apply_commands();

        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }

        sanitize(buffer);
        let mut more = false;
        for effect in self.effects.iter_mut() {
            if has_input {
                effect.start_running();
            }
            if effect.base().is_running() {
                more |= effect.process_audio_buffer(ctx, buffer);
                sanitize(buffer);
            }
        }
        more
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{DistEnv, Noyzr};
    use crate::engine::EngineConfig;

    fn ctx() -> EngineContext {
        EngineContext::new(EngineConfig::default()).unwrap()
    }

    fn gain(percent: f32) -> Box<dyn Effect> {
        let effect = DistEnv::default();
        effect.params().gain.set(percent);
        Box::new(effect)
    }

    #[test]
    fn edits_apply_on_next_period() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
        handle.append(gain(50.0)).unwrap();
        handle.append(Box::new(Noyzr::default())).unwrap();
        assert_eq!(chain.len(), 0);

        let mut buffer = vec![[0.8, 0.8]; 64];
        assert!(chain.process_audio_buffer(&ctx, &mut buffer, true));
        assert_eq!(chain.len(), 2);
        assert!((buffer[0][0] - 0.4).abs() < 1e-6);
        assert_eq!(handle.layout(), &["DistEnv", "Noyzr"]);
    }

    #[test]
    fn effects_run_in_order() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(4);
        handle.append(gain(50.0)).unwrap();
        handle.append(gain(200.0)).unwrap();
        handle.move_down(0).unwrap();
        handle.move_up(0).unwrap();
        handle.remove(0).unwrap();

        let mut buffer = vec![[0.25, 0.25]; 16];
        chain.process_audio_buffer(&ctx, &mut buffer, true);
        assert_eq!(chain.len(), 1);
        // The 200 % stage moved to the front and was removed.
        assert!((buffer[0][0] - 0.125).abs() < 1e-6);
        assert_eq!(handle.collect_garbage(), 1);
    }

    #[test]
    fn bad_edits_are_rejected_on_the_control_side() {
        let (mut handle, _chain) = effect_chain(1);
        assert!(matches!(handle.remove(0), Err(Error::ChainEdit(_))));
        handle.append(gain(100.0)).unwrap();
        assert!(matches!(handle.append(gain(100.0)), Err(Error::ChainEdit(_))));
        assert!(matches!(handle.insert(5, gain(100.0)), Err(Error::ChainEdit(_))));
        assert_eq!(handle.len(), 1);
    }

    #[test]
    fn full_queue_is_reported() {
        let (mut handle, _chain) = effect_chain(1);
        handle.append(gain(100.0)).unwrap();
        let mut result = Ok(());
        for _ in 0..=COMMAND_QUEUE_SIZE {
            result = handle.move_up(0);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(Error::ChainQueueFull)));
    }

    #[test]
    fn disabled_chain_leaves_buffer_alone() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
        handle.append(gain(50.0)).unwrap();
        handle.set_enabled(false);
        let mut buffer = vec![[0.8, 0.8]; 8];
        assert!(!chain.process_audio_buffer(&ctx, &mut buffer, true));
        assert!(buffer.iter().all(|f| *f == [0.8, 0.8]));
    }

    #[test]
    fn chain_sanitizes_its_input() {
        let ctx = ctx();
        let (_handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
        let mut buffer = vec![[f32::NAN, f32::INFINITY]; 4];
        chain.process_audio_buffer(&ctx, &mut buffer, false);
        assert!(buffer.iter().all(|f| *f == [0.0, 0.0]));
    }

    #[test]
    fn clear_retires_everything() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
        for _ in 0..3 {
            handle.append(gain(100.0)).unwrap();
        }
        handle.clear().unwrap();
        let mut buffer = vec![[0.0; 2]; 8];
        chain.process_audio_buffer(&ctx, &mut buffer, false);
        assert!(chain.is_empty());
        assert!(handle.is_empty());
        assert_eq!(handle.collect_garbage(), 3);
    }

    #[test]
    fn quiet_effects_stop_until_input_returns() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
        handle.append(gain(100.0)).unwrap();

        let mut silence = vec![[0.0; 2]; 256];
        let mut periods = 0;
        while chain.process_audio_buffer(&ctx, &mut silence, false) {
            periods += 1;
            assert!(periods < 10, "gate never closed");
        }
        assert!(chain.effect(0).is_some_and(|e| !e.base().is_running()));

        let mut buffer = vec![[0.5, 0.5]; 256];
        assert!(chain.process_audio_buffer(&ctx, &mut buffer, true));
    }

    #[test]
    fn uncollected_retirees_overflow_onto_the_audio_thread() {
        let ctx = ctx();
        let (mut handle, mut chain) = effect_chain(4);
        let retire_slots = 4 + COMMAND_QUEUE_SIZE;
        let mut buffer = vec![[0.0; 2]; 8];
        for _ in 0..retire_slots + 12 {
            handle.append(gain(100.0)).unwrap();
            handle.remove(0).unwrap();
            chain.process_audio_buffer(&ctx, &mut buffer, false);
        }
        assert!(chain.is_empty());
        assert_eq!(chain.retire_overflows(), 12);
        assert_eq!(handle.collect_garbage(), retire_slots);
    }
}
