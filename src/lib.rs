//! Motor de agenda y preparacion para una maquina de cafe compartida.
//! Administra una cola de pedidos inmediatos y reservas con horario sobre
//! un unico recurso fisico: la admision decide si hay lugar, los reportes
//! cuentan la espera y las franjas libres, y un worker prepara los cafes
//! de a uno respetando los horarios de retiro.

pub mod admission;
pub mod api;
pub mod brewing_worker;
pub mod catalog;
pub mod clock;
pub mod coffee_machine;
pub mod constants;
pub mod errors;
pub mod order;
pub mod order_store;
pub mod orders_reader;
pub mod queue_status;
pub mod shutdown;
pub mod slot_planner;
pub mod status_logger;

pub use crate::coffee_machine::CoffeeMachine;
