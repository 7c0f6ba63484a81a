//! Worker de preparacion. Es el unico hilo que prepara cafes: atiende la
//! cola de a un pedido por vez y va reflejando el avance en el registro,
//! siempre con operaciones comparar-y-cambiar para no pisar cancelaciones
//! o cambios hechos desde afuera mientras el cafe esta en la maquina.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Duration as ChronoDuration;
use log::{debug, error, info, warn};

use crate::catalog::{Catalog, Coffee};
use crate::clock::Clock;
use crate::constants::{
    ERROR_BACKOFF_MS, IDLE_WAIT_MS, MAX_PROCESSING_FACTOR, PICKUP_WINDOW_FUTURE_MINUTES,
    PICKUP_WINDOW_PAST_MINUTES, PROGRESS_LOG_STEP, SETTLE_WAIT_MS, VERY_LATE_RESERVATION_MINUTES,
    WORKER_TICK_MS,
};
use crate::errors::CoffeeMachineError;
use crate::order::{Order, OrderId, OrderStatus};
use crate::order_store::OrderStore;
use crate::shutdown::ShutdownSignal;

/// Como termino un ciclo del worker
#[derive(Debug, PartialEq, Eq)]
enum CycleOutcome {
    Idle,
    Completed,
    Aborted,
    TimedOut,
    ShuttingDown,
}

/// Decision de un tick de preparacion segun el tiempo transcurrido
#[derive(Debug, PartialEq, Eq)]
enum TickOutcome {
    Continue(u8),
    Finish,
    Timeout,
}

/// El techo se evalua antes que la finalizacion: si el tiempo transcurrido
/// se fue mas alla del limite duro, el pedido se abandona aunque la cuenta
/// diga que ya deberia estar listo
fn tick_outcome(elapsed: Duration, preparation_seconds: u32, ceiling_seconds: u32) -> TickOutcome {
    let elapsed_seconds = elapsed.as_secs_f64();
    if elapsed_seconds > f64::from(ceiling_seconds) {
        return TickOutcome::Timeout;
    }
    if elapsed_seconds >= f64::from(preparation_seconds) {
        return TickOutcome::Finish;
    }
    let progress = (elapsed_seconds / f64::from(preparation_seconds) * 100.0)
        .round()
        .min(99.0) as u8;
    TickOutcome::Continue(progress)
}

pub struct BrewingWorker {
    orders: Arc<Mutex<OrderStore>>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
}

impl BrewingWorker {
    pub fn new(
        orders: Arc<Mutex<OrderStore>>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        shutdown: Arc<ShutdownSignal>,
    ) -> BrewingWorker {
        BrewingWorker {
            orders,
            catalog,
            clock,
            shutdown,
        }
    }

    /// Bucle principal. Corre hasta que se active la señal de apagado;
    /// si eso pasa a mitad de una preparacion, el pedido vuelve a la cola.
    pub fn run(&self) {
        info!("[WORKER] Brewing worker started");
        while !self.shutdown.is_shutdown() {
            match self.cycle() {
                Ok(CycleOutcome::Idle) => {
                    debug!("[WORKER] No orders to prepare, waiting...");
                    self.shutdown.wait_timeout(Duration::from_millis(IDLE_WAIT_MS));
                }
                Ok(CycleOutcome::Completed) => {
                    self.shutdown.wait_timeout(Duration::from_millis(SETTLE_WAIT_MS));
                }
                Ok(CycleOutcome::Aborted) | Ok(CycleOutcome::TimedOut) => {}
                Ok(CycleOutcome::ShuttingDown) => break,
                Err(error) => {
                    error!("[WORKER] Error in the brewing cycle: {:?}", error);
                    self.shutdown.wait_timeout(Duration::from_millis(ERROR_BACKOFF_MS));
                }
            }
        }
        info!("[WORKER] Brewing worker stopped");
    }

    /// Un ciclo completo: mantenimiento de reservas atrasadas, eleccion del
    /// proximo pedido, espera de cortesia para reservas y preparacion
    fn cycle(&self) -> Result<CycleOutcome, CoffeeMachineError> {
        self.convert_late_reservations()?;
        let order = match self.select_next_order()? {
            Some(order) => order,
            None => return Ok(CycleOutcome::Idle),
        };
        let coffee = self
            .catalog
            .get(order.coffee_id)
            .ok_or(CoffeeMachineError::UnknownCoffee(order.coffee_id))?
            .clone();
        if self.pace_reservation(&order, coffee.preparation_seconds) {
            return Ok(CycleOutcome::ShuttingDown);
        }
        self.brew(order, &coffee)
    }

    /// Las reservas con mas de media hora de atraso dejan de esperar su
    /// horario y pasan a competir como pedidos inmediatos
    fn convert_late_reservations(&self) -> Result<(), CoffeeMachineError> {
        let cutoff = self.clock.now() - ChronoDuration::minutes(VERY_LATE_RESERVATION_MINUTES);
        let converted = self.orders.lock()?.convert_late_reservations(cutoff);
        for order in converted {
            warn!(
                "[WORKER] Reservation #{} was more than {} minutes late, now an immediate order",
                order.id, VERY_LATE_RESERVATION_MINUTES
            );
        }
        Ok(())
    }

    /// Elige el proximo pedido: primero el inmediato mas viejo, si no hay
    /// la reserva con retiro dentro de la ventana de atencion
    fn select_next_order(&self) -> Result<Option<Order>, CoffeeMachineError> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        if let Some(order) = orders.oldest_pending_immediate() {
            info!("[WORKER] Found immediate order #{}", order.id);
            return Ok(Some(order.clone()));
        }
        let window_start = now - ChronoDuration::minutes(PICKUP_WINDOW_PAST_MINUTES);
        let window_end = now + ChronoDuration::minutes(PICKUP_WINDOW_FUTURE_MINUTES);
        if let Some(order) = orders.due_reservation(window_start, window_end) {
            if let Some(pickup) = order.pickup_time {
                let minutes_until = (pickup - now).num_minutes();
                if minutes_until >= 0 {
                    info!(
                        "[WORKER] Found reservation #{} due in {} minutes",
                        order.id, minutes_until
                    );
                } else {
                    info!(
                        "[WORKER] Found overdue reservation #{} ({} minutes late)",
                        order.id, -minutes_until
                    );
                }
            }
            return Ok(Some(order.clone()));
        }
        Ok(None)
    }

    /// Espera de cortesia para que una reserva cercana salga recien hecha:
    /// si falta mas que su preparacion, el worker espera la diferencia.
    /// Devuelve true si la señal de apagado corto la espera.
    fn pace_reservation(&self, order: &Order, preparation_seconds: u32) -> bool {
        let pickup = match order.pickup_time {
            Some(pickup) => pickup,
            None => return false,
        };
        let now = self.clock.now();
        let seconds_until = (pickup - now).num_seconds();
        if seconds_until <= 0 || seconds_until >= PICKUP_WINDOW_FUTURE_MINUTES * 60 {
            return false;
        }
        let wait_seconds = seconds_until - i64::from(preparation_seconds);
        if wait_seconds <= 0 {
            return false;
        }
        info!(
            "[WORKER] Waiting {}s before preparing reservation #{}",
            wait_seconds, order.id
        );
        self.shutdown.wait_timeout(Duration::from_secs(wait_seconds as u64))
    }

    /// Prepara el cafe: toma el pedido con un claim, avanza el progreso en
    /// cada tick y lo completa, salvo que alguien lo cambie desde afuera,
    /// que el tiempo se pase del techo o que llegue el apagado
    fn brew(&self, order: Order, coffee: &Coffee) -> Result<CycleOutcome, CoffeeMachineError> {
        let preparation_seconds = coffee.preparation_seconds;
        let ceiling_seconds = preparation_seconds * MAX_PROCESSING_FACTOR;
        let estimated_completion =
            self.clock.now() + ChronoDuration::seconds(i64::from(preparation_seconds));
        {
            let mut orders = self.orders.lock()?;
            if !orders.claim_for_brewing(order.id, estimated_completion) {
                warn!("[WORKER] Order #{} changed before brewing could start", order.id);
                return Ok(CycleOutcome::Aborted);
            }
        }
        let kind = if order.is_reservation() { "reservation" } else { "order" };
        info!(
            "[WORKER] Starting preparation of {} #{}: {} ({}s)",
            kind, order.id, coffee.name, preparation_seconds
        );

        let started = Instant::now();
        let mut last_logged_progress = 0;
        loop {
            if self.shutdown.is_shutdown() {
                self.release_to_pending(order.id)?;
                info!("[WORKER] Order #{} went back to the queue for the shutdown", order.id);
                return Ok(CycleOutcome::ShuttingDown);
            }
            match tick_outcome(started.elapsed(), preparation_seconds, ceiling_seconds) {
                TickOutcome::Timeout => {
                    error!(
                        "[WORKER] Order #{} took more than {}s, abandoning it",
                        order.id, ceiling_seconds
                    );
                    self.release_to_pending(order.id)?;
                    return Ok(CycleOutcome::TimedOut);
                }
                TickOutcome::Finish => {
                    let mut orders = self.orders.lock()?;
                    if orders.complete_if_brewing(order.id) {
                        info!("[WORKER] Order #{} completed!", order.id);
                        return Ok(CycleOutcome::Completed);
                    }
                    error!(
                        "[WORKER] Order #{} was cancelled or modified externally",
                        order.id
                    );
                    return Ok(CycleOutcome::Aborted);
                }
                TickOutcome::Continue(progress) => {
                    let mut orders = self.orders.lock()?;
                    let still_brewing = orders
                        .get(order.id)
                        .map_or(false, |fresh| fresh.status == OrderStatus::Brewing);
                    if !still_brewing {
                        drop(orders);
                        error!(
                            "[WORKER] Order #{} was cancelled or modified externally",
                            order.id
                        );
                        return Ok(CycleOutcome::Aborted);
                    }
                    orders.update(order.id, |order| order.progress = progress);
                    drop(orders);
                    if progress >= last_logged_progress + PROGRESS_LOG_STEP {
                        debug!("[WORKER] Order #{} at {}%", order.id, progress);
                        last_logged_progress = progress - progress % PROGRESS_LOG_STEP;
                    }
                }
            }
            // si la señal corta la espera, el proximo tick la atiende
            self.shutdown.wait_timeout(Duration::from_millis(WORKER_TICK_MS));
        }
    }

    /// Compensacion al abandonar una preparacion: el pedido vuelve a
    /// pendiente, salvo que ya lo hayan cambiado desde afuera
    fn release_to_pending(&self, id: OrderId) -> Result<(), CoffeeMachineError> {
        let mut orders = self.orders.lock()?;
        if !orders.release_if_brewing(id) {
            warn!("[WORKER] Order #{} was already modified, leaving it as is", id);
        }
        Ok(())
    }
}
