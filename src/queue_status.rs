//! Vistas de solo lectura sobre la cola: estado, franjas y progreso.
//! Son las consultas que la capa de transporte expone a los clientes.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::constants::NEXT_SLOT_GRID_MINUTES;
use crate::errors::OrderRejection;
use crate::order::{Order, OrderId, OrderStatus};
use crate::order_store::OrderStore;
use crate::slot_planner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Idle,
    Busy,
}

/// Foto de la cola en el orden en que se va a atender
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusView {
    pub current_order: Option<Order>,
    pub queue: Vec<Order>,
    pub queue_length: usize,
    pub estimated_wait_seconds: i64,
    pub machine_status: MachineStatus,
}

/// Proxima franja sugerida si el pedido se hiciera ahora
#[derive(Debug, Clone, Serialize)]
pub struct NextSlotView {
    pub next_available_slot: DateTime<Utc>,
    pub waiting_time_minutes: i64,
    pub queue_position: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotOption {
    pub time: DateTime<Utc>,
    pub is_next_available: bool,
}

/// Franjas libres dentro del horario de atencion
#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlotsView {
    pub available_slots: Vec<SlotOption>,
    pub earliest_slot: Option<SlotOption>,
    pub total_options: usize,
}

/// Resultado de consultar si un horario puntual esta libre
#[derive(Debug, Clone, Serialize)]
pub struct SlotValidationView {
    pub is_available: bool,
    pub requested_time: DateTime<Utc>,
    pub earliest_available_time: DateTime<Utc>,
    pub message: String,
}

/// Progreso de un pedido. Los segundos restantes solo corren
/// mientras el pedido esta en preparacion.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub status: OrderStatus,
    pub progress: u8,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DayHours {
    pub open: &'static str,
    pub close: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyHours {
    pub monday: Option<DayHours>,
    pub tuesday: Option<DayHours>,
    pub wednesday: Option<DayHours>,
    pub thursday: Option<DayHours>,
    pub friday: Option<DayHours>,
    pub saturday: Option<DayHours>,
    pub sunday: Option<DayHours>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpeningHoursView {
    pub opening_hours: WeeklyHours,
    pub timezone: &'static str,
    pub current_time: String,
}

pub struct QueueStatusReporter {
    orders: Arc<Mutex<OrderStore>>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
}

impl QueueStatusReporter {
    pub fn new(
        orders: Arc<Mutex<OrderStore>>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> QueueStatusReporter {
        QueueStatusReporter {
            orders,
            catalog,
            clock,
        }
    }

    /// Estado de la cola: el pedido en curso, los que esperan en orden de
    /// atencion y la espera estimada para un pedido nuevo
    pub fn queue_status(&self) -> Result<QueueStatusView, OrderRejection> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        let current_order = orders.brewing_order().cloned();
        let queue = orders.queue_in_service_order();
        let estimated_wait_seconds =
            slot_planner::remaining_brew_seconds(current_order.as_ref(), now)
                + slot_planner::queued_preparation_seconds(&queue, &self.catalog, now, None);
        Ok(QueueStatusView {
            queue_length: queue.len(),
            estimated_wait_seconds,
            machine_status: if current_order.is_some() {
                MachineStatus::Busy
            } else {
                MachineStatus::Idle
            },
            current_order,
            queue,
        })
    }

    /// Proxima franja en la grilla corta, contando todos los pedidos pendientes
    pub fn next_slot(&self) -> Result<NextSlotView, OrderRejection> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        let pending = orders.pending_orders();
        let total_wait_seconds = slot_planner::remaining_brew_seconds(orders.brewing_order(), now)
            + slot_planner::queued_preparation_seconds(&pending, &self.catalog, now, None);
        let next_available_slot = slot_planner::round_up_to_grid(
            now + Duration::seconds(total_wait_seconds),
            NEXT_SLOT_GRID_MINUTES,
        );
        Ok(NextSlotView {
            next_available_slot,
            waiting_time_minutes: (total_wait_seconds as f64 / 60.0).round() as i64,
            queue_position: pending.len() + 1,
        })
    }

    /// Franjas libres para reservar, a partir de lo que tarda en vaciarse la cola
    pub fn available_slots(&self) -> Result<AvailableSlotsView, OrderRejection> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        let pending = orders.pending_orders();
        let total_wait_seconds = slot_planner::remaining_brew_seconds(orders.brewing_order(), now)
            + slot_planner::queued_preparation_seconds(&pending, &self.catalog, now, None);
        let reserved_pickups = orders
            .pending_reservations()
            .iter()
            .filter_map(|order| order.pickup_time)
            .collect();
        drop(orders);
        let base = now + Duration::seconds(total_wait_seconds);
        let available_slots: Vec<SlotOption> = slot_planner::candidate_slots(base, reserved_pickups)
            .enumerate()
            .map(|(index, time)| SlotOption {
                time,
                is_next_available: index == 0,
            })
            .collect();
        Ok(AvailableSlotsView {
            earliest_slot: available_slots.first().cloned(),
            total_options: available_slots.len(),
            available_slots,
        })
    }

    /// Responde si un horario puntual esta libre, sin reservarlo
    pub fn validate_slot(
        &self,
        requested: DateTime<Utc>,
    ) -> Result<SlotValidationView, OrderRejection> {
        let now = self.clock.now();
        if requested <= now {
            return Err(OrderRejection::PickupTimeInPast);
        }
        let orders = self.orders.lock()?;
        let pending = orders.pending_orders();
        let earliest = slot_planner::earliest_available(
            now,
            orders.brewing_order(),
            &pending,
            &self.catalog,
            0,
            None,
        );
        let is_occupied = orders
            .pending_reservations()
            .iter()
            .any(|order| order.pickup_time == Some(requested));
        drop(orders);
        let is_available = requested > earliest && !is_occupied;
        let message = if is_occupied {
            String::from("This slot is already reserved")
        } else if requested <= earliest {
            format!(
                "Slot too early. The machine is free starting at {}",
                earliest.format("%H:%M:%S")
            )
        } else {
            String::from("The slot is available")
        };
        Ok(SlotValidationView {
            is_available,
            requested_time: requested,
            earliest_available_time: earliest,
            message,
        })
    }

    /// Progreso de un pedido puntual
    pub fn progress(&self, id: OrderId) -> Result<ProgressView, OrderRejection> {
        let now = self.clock.now();
        let orders = self.orders.lock()?;
        let order = orders.get(id).ok_or(OrderRejection::NotFound(id))?;
        let remaining_seconds = if order.status == OrderStatus::Brewing {
            slot_planner::remaining_brew_seconds(Some(order), now)
        } else {
            0
        };
        Ok(ProgressView {
            status: order.status,
            progress: order.progress,
            estimated_completion: order.estimated_completion_time,
            remaining_seconds,
        })
    }

    /// Confirma que el pedido esta en cola: el worker lo va a levantar solo,
    /// aca no se dispara nada
    pub fn acknowledge_start(&self, id: OrderId) -> Result<Order, OrderRejection> {
        let orders = self.orders.lock()?;
        let order = orders.get(id).ok_or(OrderRejection::NotFound(id))?;
        if order.status != OrderStatus::Pending {
            warn!(
                "[STATUS] Order #{} cannot be started, it is {:?}",
                id, order.status
            );
            return Err(OrderRejection::NotPending {
                status: order.status,
            });
        }
        info!("[STATUS] Order #{} is queued and will be picked up by the worker", id);
        Ok(order.clone())
    }

    /// Un pedido puntual
    pub fn order(&self, id: OrderId) -> Result<Order, OrderRejection> {
        let orders = self.orders.lock()?;
        orders.get(id).cloned().ok_or(OrderRejection::NotFound(id))
    }

    /// Todos los pedidos, por id
    pub fn orders(&self) -> Result<Vec<Order>, OrderRejection> {
        let orders = self.orders.lock()?;
        Ok(orders.orders())
    }

    /// Horario semanal de atencion
    pub fn opening_hours(&self) -> OpeningHoursView {
        let weekday = DayHours {
            open: "08:00",
            close: "18:00",
        };
        OpeningHoursView {
            opening_hours: WeeklyHours {
                monday: Some(weekday),
                tuesday: Some(weekday),
                wednesday: Some(weekday),
                thursday: Some(weekday),
                friday: Some(weekday),
                saturday: Some(DayHours {
                    open: "09:00",
                    close: "17:00",
                }),
                sunday: None,
            },
            timezone: "UTC",
            current_time: self.clock.now().format("%H:%M").to_string(),
        }
    }
}
