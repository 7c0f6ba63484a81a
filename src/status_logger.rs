//! Reporte periodico del estado de la maquina por el log

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info};

use crate::clock::Clock;
use crate::constants::{
    PICKUP_WINDOW_FUTURE_MINUTES, UPCOMING_RESERVATIONS_PREVIEW, VERY_LATE_RESERVATION_MINUTES,
};
use crate::errors::CoffeeMachineError;
use crate::order_store::OrderStore;
use crate::shutdown::ShutdownSignal;

/// Imprime cada tanto una foto de la cola: el pedido en curso, cuantos
/// esperan y las proximas reservas con su atraso o anticipo
pub struct StatusLogger {
    orders: Arc<Mutex<OrderStore>>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
    interval: Duration,
}

impl StatusLogger {
    pub fn new(
        orders: Arc<Mutex<OrderStore>>,
        clock: Arc<dyn Clock>,
        shutdown: Arc<ShutdownSignal>,
        interval: Duration,
    ) -> StatusLogger {
        StatusLogger {
            orders,
            clock,
            shutdown,
            interval,
        }
    }

    /// Corre hasta que se active la señal de apagado
    pub fn run(&self) {
        while !self.shutdown.wait_timeout(self.interval) {
            if let Err(error) = self.log_status() {
                error!("[STATUS] Error reading the machine status: {:?}", error);
            }
        }
        info!("[STATUS] Status logger stopped");
    }

    fn log_status(&self) -> Result<(), CoffeeMachineError> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        let current = orders
            .brewing_order()
            .map(|order| format!("#{}", order.id))
            .unwrap_or_else(|| String::from("none"));
        let immediate_count = orders.pending_immediate_count();
        let reservation_count = orders.pending_reservations().len();
        let overdue_count = orders.overdue_reservation_count(now);
        let upcoming = orders.upcoming_reservations(UPCOMING_RESERVATIONS_PREVIEW);
        drop(orders);
        info!(
            "[STATUS] Machine status - Current: {}, Immediate: {}, Reservations: {}, Overdue: {}",
            current, immediate_count, reservation_count, overdue_count
        );
        for reservation in upcoming {
            if let Some(pickup) = reservation.pickup_time {
                let minutes_until = (pickup - now).num_minutes();
                let marker = if minutes_until <= -VERY_LATE_RESERVATION_MINUTES {
                    "very late"
                } else if minutes_until <= 0 {
                    "ready to process"
                } else if minutes_until <= PICKUP_WINDOW_FUTURE_MINUTES {
                    "due soon"
                } else {
                    "scheduled"
                };
                debug!(
                    "[STATUS] Reservation #{} at {} (in {} minutes, {})",
                    reservation.id,
                    pickup.format("%H:%M"),
                    minutes_until,
                    marker
                );
            }
        }
        Ok(())
    }
}
