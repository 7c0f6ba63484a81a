//! Señal de apagado cooperativa de la maquina

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use log::error;

/// Token de apagado que comparten todos los hilos de la maquina.
/// Las esperas del worker y del log de estado pasan por aca, asi un
/// apagado las despierta en lugar de esperar a que venza el timeout.
pub struct ShutdownSignal {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> ShutdownSignal {
        ShutdownSignal {
            stopped: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    /// Activa la señal y despierta a todos los hilos que esten esperando
    pub fn shutdown(&self) {
        if let Ok(mut stopped) = self.stopped.lock() {
            *stopped = true;
            self.signal.notify_all();
            return;
        }
        error!("[SHUTDOWN] Error setting the machine to shutdown");
    }

    pub fn is_shutdown(&self) -> bool {
        // un lock envenenado equivale a estar apagandose
        self.stopped.lock().map(|stopped| *stopped).unwrap_or(true)
    }

    /// Espera hasta que venza el timeout o se active la señal, lo que pase primero.
    /// Devuelve true si la señal quedo activada.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let stopped = match self.stopped.lock() {
            Ok(stopped) => stopped,
            Err(_) => return true,
        };
        match self
            .signal
            .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
        {
            Ok((stopped, _)) => *stopped,
            Err(_) => true,
        }
    }
}
