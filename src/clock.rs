//! Fuente de tiempo de la maquina

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Fuente del instante actual. Toda la aritmetica de horarios de la maquina
/// es relativa a este reloj, lo que permite correr los tests con un reloj manual.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj del sistema en UTC
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reloj que solo avanza cuando se lo pide, pensado para los tests
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> ManualClock {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = instant;
        }
    }

    pub fn advance(&self, delta: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = *now + delta;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
