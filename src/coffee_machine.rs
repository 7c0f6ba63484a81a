//! Armado de la maquina: el estado compartido y los hilos de servicio

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::admission::AdmissionController;
use crate::brewing_worker::BrewingWorker;
use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::constants::STATUS_LOG_INTERVAL_MS;
use crate::order_store::OrderStore;
use crate::queue_status::QueueStatusReporter;
use crate::shutdown::ShutdownSignal;
use crate::status_logger::StatusLogger;

/// La maquina completa: arma el registro de pedidos, lanza el worker de
/// preparacion junto con el log de estado y reparte los handles con los que
/// se admiten y consultan pedidos
pub struct CoffeeMachine {
    orders: Arc<Mutex<OrderStore>>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<ShutdownSignal>,
    threads: Vec<JoinHandle<()>>,
}

impl CoffeeMachine {
    pub fn new(catalog: Catalog) -> CoffeeMachine {
        CoffeeMachine::with_clock(catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(catalog: Catalog, clock: Arc<dyn Clock>) -> CoffeeMachine {
        CoffeeMachine {
            orders: Arc::new(Mutex::new(OrderStore::new())),
            catalog: Arc::new(catalog),
            clock,
            shutdown: Arc::new(ShutdownSignal::new()),
            threads: Vec::new(),
        }
    }

    /// Lanza los hilos de servicio. Se llama una sola vez.
    pub fn start(&mut self) {
        let worker = BrewingWorker::new(
            self.orders.clone(),
            self.catalog.clone(),
            self.clock.clone(),
            self.shutdown.clone(),
        );
        self.threads.push(thread::spawn(move || worker.run()));

        let status_logger = StatusLogger::new(
            self.orders.clone(),
            self.clock.clone(),
            self.shutdown.clone(),
            Duration::from_millis(STATUS_LOG_INTERVAL_MS),
        );
        self.threads.push(thread::spawn(move || status_logger.run()));
        info!("[MACHINE] Coffee machine started");
    }

    pub fn admission(&self) -> AdmissionController {
        AdmissionController::new(self.orders.clone(), self.catalog.clone(), self.clock.clone())
    }

    pub fn reporter(&self) -> QueueStatusReporter {
        QueueStatusReporter::new(self.orders.clone(), self.catalog.clone(), self.clock.clone())
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownSignal> {
        self.shutdown.clone()
    }

    /// Activa la señal de apagado y espera a que los hilos terminen.
    /// Si habia un cafe en preparacion, el worker lo devuelve a la cola
    /// antes de terminar.
    pub fn shutdown(&mut self) {
        self.shutdown.shutdown();
        self.join();
    }

    /// Espera a que los hilos de servicio terminen
    pub fn join(&mut self) {
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                error!("[MACHINE] A service thread panicked");
            }
        }
        info!("[MACHINE] Coffee machine stopped");
    }
}

#[cfg(test)]
mod coffee_machine_tests {
    use std::time::Instant;

    use super::*;
    use crate::admission::SubmitOrderRequest;
    use crate::catalog::Coffee;
    use crate::order::{OrderId, OrderStatus};
    use crate::queue_status::MachineStatus;

    fn fast_catalog() -> Catalog {
        Catalog::new(vec![
            Coffee {
                id: 1,
                name: String::from("shot"),
                price: 1.0,
                preparation_seconds: 1,
            },
            Coffee {
                id: 2,
                name: String::from("double"),
                price: 2.0,
                preparation_seconds: 3,
            },
        ])
        .expect("the test menu should be valid")
    }

    fn immediate(coffee_id: u64) -> SubmitOrderRequest {
        SubmitOrderRequest {
            coffee_id,
            customer_name: Some(String::from("Ana")),
            pickup_time: None,
        }
    }

    fn wait_until<F: Fn() -> bool>(deadline: Duration, condition: F) -> bool {
        let started = Instant::now();
        while started.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        condition()
    }

    fn status_of(machine: &CoffeeMachine, id: OrderId) -> Option<OrderStatus> {
        machine.reporter().progress(id).ok().map(|view| view.status)
    }

    #[test]
    fn should_start_and_shut_down_cleanly() {
        let mut machine = CoffeeMachine::new(Catalog::default_menu());
        machine.start();
        machine.shutdown();
        assert!(machine.threads.is_empty());
    }

    #[test]
    fn should_share_the_same_orders_between_handles() {
        let machine = CoffeeMachine::new(Catalog::default_menu());
        let admission = machine.admission();
        let reporter = machine.reporter();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        let status = reporter.queue_status().expect("the report should work");
        assert_eq!(1, status.queue_length);
        assert_eq!(order.id, status.queue[0].id);
    }

    #[test]
    fn should_brew_a_submitted_order_end_to_end() {
        let mut machine = CoffeeMachine::new(fast_catalog());
        machine.start();
        let order = machine
            .admission()
            .submit(immediate(1))
            .expect("the order should be accepted");
        let completed = wait_until(Duration::from_secs(5), || {
            status_of(&machine, order.id) == Some(OrderStatus::Completed)
        });
        machine.shutdown();
        assert!(completed);
        let progress = machine
            .reporter()
            .progress(order.id)
            .expect("the order should still exist");
        assert_eq!(100, progress.progress);
        assert_eq!(0, progress.remaining_seconds);
    }

    #[test]
    fn should_admit_only_one_immediate_order_under_concurrency() {
        let mut machine = CoffeeMachine::new(fast_catalog());
        machine.start();
        let admissions: Vec<_> = (0..8).map(|_| machine.admission()).collect();
        let handles: Vec<_> = admissions
            .into_iter()
            .map(|admission| thread::spawn(move || admission.submit(immediate(2)).is_ok()))
            .collect();
        let accepted = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|result| matches!(result, Ok(true)))
            .count();
        assert_eq!(1, accepted);
        // mientras el cafe aceptado se prepara nunca hay mas de uno en curso
        let reporter = machine.reporter();
        let sampling_deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < sampling_deadline {
            let status = reporter.queue_status().expect("the report should work");
            if status.machine_status == MachineStatus::Busy {
                let brewing = status.current_order.expect("busy implies a current order");
                assert_eq!(OrderStatus::Brewing, brewing.status);
            }
            thread::sleep(Duration::from_millis(20));
        }
        machine.shutdown();
    }

    #[test]
    fn should_return_the_brewing_order_to_the_queue_when_shut_down() {
        let mut machine = CoffeeMachine::new(fast_catalog());
        machine.start();
        let order = machine
            .admission()
            .submit(immediate(2))
            .expect("the order should be accepted");
        assert!(wait_until(Duration::from_secs(5), || {
            status_of(&machine, order.id) == Some(OrderStatus::Brewing)
        }));
        machine.shutdown();
        let progress = machine
            .reporter()
            .progress(order.id)
            .expect("the order should still exist");
        assert_eq!(OrderStatus::Pending, progress.status);
        assert_eq!(0, progress.progress);
        assert_eq!(None, progress.estimated_completion);
    }
}
