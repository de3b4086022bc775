/*!
 * Simulation Clock and Halt Signal
 *
 * The clock counts logical time units and sleeps a configurable amount of real
 * time per unit. Every suspension goes through `SimClock::advance`, which races
 * the sleep against the halt signal so an external stop unwinds promptly.
 */

use super::types::Tick;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Marker returned when a suspension point observed the halt signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted;

/// Create a connected halt handle and signal
pub fn halt_channel() -> (HaltHandle, HaltSignal) {
    let (tx, rx) = watch::channel(false);
    (
        HaltHandle { tx: Arc::new(tx) },
        HaltSignal {
            rx,
            _keepalive: None,
        },
    )
}

/// Sender side: requests the simulation to stop
#[derive(Debug, Clone)]
pub struct HaltHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl HaltHandle {
    pub fn halt(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_halted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiver side: observed at every suspension point
#[derive(Debug, Clone)]
pub struct HaltSignal {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl HaltSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (handle, mut signal) = halt_channel();
        signal._keepalive = Some(handle.tx);
        signal
    }

    pub fn is_halted(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn check(&self) -> Result<(), Halted> {
        if self.is_halted() {
            Err(Halted)
        } else {
            Ok(())
        }
    }

    /// Resolves once a halt has been requested
    pub async fn halted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Every handle dropped: nobody can halt us any more
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Logical clock with real-time pacing
#[derive(Debug)]
pub struct SimClock {
    now: Tick,
    unit: Duration,
}

impl SimClock {
    pub fn new(unit: Duration) -> Self {
        Self { now: 0, unit }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// Let `units` of time elapse, unless the halt signal fires first
    pub async fn advance(&mut self, units: u64, halt: &mut HaltSignal) -> Result<(), Halted> {
        halt.check()?;
        if units == 0 {
            return Ok(());
        }

        let real = self.unit.saturating_mul(units.min(u32::MAX as u64) as u32);
        if !real.is_zero() {
            tokio::select! {
                biased;
                _ = halt.halted() => return Err(Halted),
                _ = tokio::time::sleep(real) => {}
            }
        }

        self.now = self.now.saturating_add(units);
        Ok(())
    }

    /// Advance to an absolute tick; no-op when already there
    pub async fn advance_to(&mut self, tick: Tick, halt: &mut HaltSignal) -> Result<(), Halted> {
        let units = tick.saturating_sub(self.now);
        self.advance(units, halt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_advance_counts_units() {
        let mut clock = SimClock::new(Duration::ZERO);
        let mut halt = HaltSignal::never();

        clock.advance(3, &mut halt).await.unwrap();
        clock.advance_to(5, &mut halt).await.unwrap();
        clock.advance_to(2, &mut halt).await.unwrap();
        assert_eq!(clock.now(), 5);
    }

    #[tokio::test]
    async fn test_halt_interrupts_sleep() {
        let mut clock = SimClock::new(Duration::from_secs(3600));
        let (handle, mut halt) = halt_channel();

        let stopper = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stopper.halt();
        });

        assert_eq!(clock.advance(1, &mut halt).await, Err(Halted));
        assert_eq!(clock.now(), 0);
        assert!(handle.is_halted());
    }

    #[tokio::test]
    async fn test_halted_before_advance() {
        let mut clock = SimClock::new(Duration::ZERO);
        let (handle, mut halt) = halt_channel();
        handle.halt();

        assert_eq!(clock.advance(0, &mut halt).await, Err(Halted));
        assert_eq!(halt.check(), Err(Halted));
    }
}
