//! Control de admision de pedidos inmediatos y reservas.
//! Todas las reglas corren con el lock del registro tomado, asi dos
//! pedidos que llegan a la vez no pueden aceptarse contra el mismo lugar.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Deserialize;

use crate::catalog::{Catalog, Coffee};
use crate::clock::Clock;
use crate::constants::{
    ADMISSION_HORIZON_MINUTES, DEFAULT_CUSTOMER_NAME, MAX_CUSTOMER_NAME_CHARS,
    MIN_OVERLAP_BUFFER_SECONDS,
};
use crate::errors::OrderRejection;
use crate::order::{CoffeeId, Order, OrderId, OrderStatus};
use crate::order_store::OrderStore;
use crate::slot_planner;

/// Pedido entrante, ya sea inmediato o con horario de retiro
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOrderRequest {
    pub coffee_id: CoffeeId,
    pub customer_name: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
}

/// Modificacion parcial de un pedido pendiente. Los campos en None
/// quedan como estaban.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub coffee_id: Option<CoffeeId>,
    pub customer_name: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
}

pub struct AdmissionController {
    orders: Arc<Mutex<OrderStore>>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    pub fn new(
        orders: Arc<Mutex<OrderStore>>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> AdmissionController {
        AdmissionController {
            orders,
            catalog,
            clock,
        }
    }

    /// Evalua un pedido entrante y lo da de alta si hay lugar.
    /// Un inmediato se rechaza si ya hay otro en curso, y una reserva se
    /// rechaza si pisa otra reserva o si llega antes de lo que la maquina
    /// puede preparar el cafe.
    pub fn submit(&self, request: SubmitOrderRequest) -> Result<Order, OrderRejection> {
        let now = self.clock.now();
        let coffee = self
            .catalog
            .get(request.coffee_id)
            .ok_or(OrderRejection::UnknownCoffee(request.coffee_id))?
            .clone();
        if let Some(name) = &request.customer_name {
            if name.chars().count() > MAX_CUSTOMER_NAME_CHARS {
                return Err(OrderRejection::CustomerNameTooLong);
            }
        }
        if let Some(pickup) = request.pickup_time {
            if pickup <= now {
                return Err(OrderRejection::PickupTimeInPast);
            }
        }

        let mut orders = self.orders.lock()?;
        match request.pickup_time {
            None => self.check_immediate(&orders)?,
            Some(pickup) => self.check_reservation(&orders, &coffee, pickup, now)?,
        }
        let customer_name = request
            .customer_name
            .unwrap_or_else(|| String::from(DEFAULT_CUSTOMER_NAME));
        let order = orders.insert(request.coffee_id, customer_name, request.pickup_time, now);
        let kind = if order.is_reservation() { "reservation" } else { "order" };
        info!(
            "[ADMISSION] Accepted {} #{} of {} for {}",
            kind, order.id, coffee.name, order.customer_name
        );
        Ok(order)
    }

    /// Un inmediato por vez: rechaza si hay uno en preparacion o uno
    /// inmediato todavia pendiente
    fn check_immediate(&self, orders: &OrderStore) -> Result<(), OrderRejection> {
        if let Some(current) = orders.brewing_order() {
            return Err(OrderRejection::MachineBusy {
                current_order: current.clone(),
            });
        }
        if let Some(waiting) = orders.oldest_pending_immediate() {
            return Err(OrderRejection::MachineBusy {
                current_order: waiting.clone(),
            });
        }
        Ok(())
    }

    /// La superposicion se evalua antes que el horario minimo, asi el
    /// cliente recibe la franja sugerida cuando el lugar ya esta tomado
    fn check_reservation(
        &self,
        orders: &OrderStore,
        coffee: &Coffee,
        pickup: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderRejection> {
        let reservations = orders.pending_reservations();
        let buffer_seconds = i64::from(coffee.preparation_seconds).max(MIN_OVERLAP_BUFFER_SECONDS);
        if let Some(overlapping) =
            slot_planner::find_overlap(pickup, &reservations, buffer_seconds)
        {
            let overlap_preparation = self
                .catalog
                .preparation_seconds(overlapping.coffee_id)
                .unwrap_or(0);
            let overlap_pickup = overlapping.pickup_time.unwrap_or(pickup);
            let suggested =
                slot_planner::next_free_after_overlap(overlap_pickup, overlap_preparation, pickup);
            return Err(OrderRejection::SlotTaken {
                suggested,
                overlapping: overlapping.clone(),
            });
        }

        let pending = orders.pending_orders();
        let horizon = Some(Duration::minutes(ADMISSION_HORIZON_MINUTES));
        let earliest = slot_planner::earliest_available(
            now,
            orders.brewing_order(),
            &pending,
            &self.catalog,
            coffee.preparation_seconds,
            horizon,
        );
        if pickup < earliest {
            return Err(OrderRejection::TooEarly { earliest });
        }
        Ok(())
    }

    /// Modifica un pedido que sigue pendiente
    // TODO: permitir pasar una reserva a pedido inmediato desde la modificacion,
    // hoy un pickup_time en None se interpreta como "no cambiar"
    pub fn update(
        &self,
        id: OrderId,
        request: UpdateOrderRequest,
    ) -> Result<Order, OrderRejection> {
        let now = self.clock.now();
        if let Some(coffee_id) = request.coffee_id {
            self.catalog
                .get(coffee_id)
                .ok_or(OrderRejection::UnknownCoffee(coffee_id))?;
        }
        if let Some(name) = &request.customer_name {
            if name.chars().count() > MAX_CUSTOMER_NAME_CHARS {
                return Err(OrderRejection::CustomerNameTooLong);
            }
        }
        if let Some(pickup) = request.pickup_time {
            if pickup <= now {
                return Err(OrderRejection::PickupTimeInPast);
            }
        }

        let mut orders = self.orders.lock()?;
        let status = orders.get(id).ok_or(OrderRejection::NotFound(id))?.status;
        if status != OrderStatus::Pending {
            return Err(OrderRejection::NotPending { status });
        }
        let updated = orders
            .update(id, |order| {
                if let Some(coffee_id) = request.coffee_id {
                    order.coffee_id = coffee_id;
                }
                if let Some(name) = request.customer_name {
                    order.customer_name = name;
                }
                if let Some(pickup) = request.pickup_time {
                    order.pickup_time = Some(pickup);
                }
            })
            .ok_or(OrderRejection::NotFound(id))?;
        info!("[ADMISSION] Updated order #{}", id);
        Ok(updated)
    }

    /// Cancela y elimina un pedido que sigue pendiente
    pub fn delete(&self, id: OrderId) -> Result<Order, OrderRejection> {
        let mut orders = self.orders.lock()?;
        let status = orders.get(id).ok_or(OrderRejection::NotFound(id))?.status;
        if status != OrderStatus::Pending {
            return Err(OrderRejection::NotPending { status });
        }
        let removed = orders.remove(id).ok_or(OrderRejection::NotFound(id))?;
        info!("[ADMISSION] Cancelled order #{}", id);
        Ok(removed)
    }
}

#[cfg(test)]
mod admission_tests {
    use chrono::TimeZone;

    use super::*;
    use crate::clock::ManualClock;

    fn fixture() -> (AdmissionController, Arc<Mutex<OrderStore>>, Arc<ManualClock>) {
        let orders = Arc::new(Mutex::new(OrderStore::new()));
        let catalog = Arc::new(Catalog::default_menu());
        let start = Utc.with_ymd_and_hms(2025, 5, 12, 10, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let admission = AdmissionController::new(orders.clone(), catalog, clock.clone());
        (admission, orders, clock)
    }

    fn immediate(coffee_id: CoffeeId) -> SubmitOrderRequest {
        SubmitOrderRequest {
            coffee_id,
            customer_name: Some(String::from("Ana")),
            pickup_time: None,
        }
    }

    fn reservation(coffee_id: CoffeeId, pickup: DateTime<Utc>) -> SubmitOrderRequest {
        SubmitOrderRequest {
            coffee_id,
            customer_name: Some(String::from("Ana")),
            pickup_time: Some(pickup),
        }
    }

    #[test]
    fn should_accept_an_immediate_order_when_the_machine_is_free() {
        let (admission, _, _) = fixture();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        assert_eq!(OrderStatus::Pending, order.status);
        assert_eq!(0, order.progress);
        assert!(!order.is_reservation());
    }

    #[test]
    fn should_use_the_default_customer_name_when_none_is_given() {
        let (admission, _, _) = fixture();
        let request = SubmitOrderRequest {
            coffee_id: 1,
            customer_name: None,
            pickup_time: None,
        };
        let order = admission.submit(request).expect("the order should be accepted");
        assert_eq!(DEFAULT_CUSTOMER_NAME, order.customer_name);
    }

    #[test]
    fn should_reject_a_second_immediate_order() {
        let (admission, _, _) = fixture();
        let first = admission.submit(immediate(1)).expect("the order should be accepted");
        let rejection = admission.submit(immediate(2)).expect_err("it should be rejected");
        match rejection {
            OrderRejection::MachineBusy { current_order } => assert_eq!(first.id, current_order.id),
            other => panic!("expected MachineBusy, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_an_immediate_order_while_another_is_brewing() {
        let (admission, orders, clock) = fixture();
        let now = clock.now();
        let brewing_id = {
            let mut orders = orders.lock().expect("the lock should not be poisoned");
            let order = orders.insert(2, String::from("Juan"), None, now);
            assert!(orders.claim_for_brewing(order.id, now + Duration::seconds(60)));
            order.id
        };
        let rejection = admission.submit(immediate(1)).expect_err("it should be rejected");
        match rejection {
            OrderRejection::MachineBusy { current_order } => {
                assert_eq!(brewing_id, current_order.id);
                assert_eq!(OrderStatus::Brewing, current_order.status);
            }
            other => panic!("expected MachineBusy, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_an_unknown_coffee() {
        let (admission, _, _) = fixture();
        let rejection = admission.submit(immediate(99)).expect_err("it should be rejected");
        assert_eq!(OrderRejection::UnknownCoffee(99), rejection);
    }

    #[test]
    fn should_reject_a_pickup_time_that_is_not_in_the_future() {
        let (admission, _, clock) = fixture();
        let now = clock.now();
        let rejection = admission
            .submit(reservation(1, now - Duration::minutes(5)))
            .expect_err("it should be rejected");
        assert_eq!(OrderRejection::PickupTimeInPast, rejection);
        let rejection = admission
            .submit(reservation(1, now))
            .expect_err("it should be rejected");
        assert_eq!(OrderRejection::PickupTimeInPast, rejection);
    }

    #[test]
    fn should_reject_a_customer_name_over_the_maximum_length() {
        let (admission, _, _) = fixture();
        let request = SubmitOrderRequest {
            coffee_id: 1,
            customer_name: Some("x".repeat(MAX_CUSTOMER_NAME_CHARS + 1)),
            pickup_time: None,
        };
        let rejection = admission.submit(request).expect_err("it should be rejected");
        assert_eq!(OrderRejection::CustomerNameTooLong, rejection);
    }

    #[test]
    fn should_accept_a_reservation_with_a_free_slot() {
        let (admission, _, clock) = fixture();
        let pickup = clock.now() + Duration::hours(1);
        let order = admission
            .submit(reservation(1, pickup))
            .expect("the reservation should be accepted");
        assert_eq!(Some(pickup), order.pickup_time);
        assert_eq!(OrderStatus::Pending, order.status);
    }

    #[test]
    fn should_reject_a_reservation_before_the_machine_can_prepare_it() {
        let (admission, orders, clock) = fixture();
        let now = clock.now();
        {
            let mut orders = orders.lock().expect("the lock should not be poisoned");
            let order = orders.insert(2, String::from("Juan"), None, now);
            assert!(orders.claim_for_brewing(order.id, now + Duration::seconds(40)));
        }
        let rejection = admission
            .submit(reservation(1, now + Duration::seconds(30)))
            .expect_err("it should be rejected");
        // 40s del pedido en curso mas los 30s del espresso nuevo
        assert_eq!(
            OrderRejection::TooEarly {
                earliest: now + Duration::seconds(70)
            },
            rejection
        );
    }

    #[test]
    fn should_suggest_the_next_free_slot_for_a_duplicated_reservation() {
        let (admission, _, clock) = fixture();
        let pickup = clock.now() + Duration::hours(1);
        let first = admission
            .submit(reservation(1, pickup))
            .expect("the reservation should be accepted");
        let rejection = admission
            .submit(reservation(1, pickup))
            .expect_err("it should be rejected");
        match rejection {
            OrderRejection::SlotTaken {
                suggested,
                overlapping,
            } => {
                assert_eq!(first.id, overlapping.id);
                // 11:00 mas 30s de preparacion mas 60s de separacion, a grilla de 15
                assert_eq!(Utc.with_ymd_and_hms(2025, 5, 12, 11, 15, 0).unwrap(), suggested);
            }
            other => panic!("expected SlotTaken, got {:?}", other),
        }
    }

    #[test]
    fn should_reject_a_reservation_within_the_overlap_buffer() {
        let (admission, _, clock) = fixture();
        let pickup = clock.now() + Duration::hours(1);
        admission
            .submit(reservation(2, pickup))
            .expect("the reservation should be accepted");
        let rejection = admission
            .submit(reservation(1, pickup + Duration::seconds(20)))
            .expect_err("it should be rejected");
        assert!(matches!(rejection, OrderRejection::SlotTaken { .. }));
    }

    #[test]
    fn should_report_the_taken_slot_before_the_minimum_time() {
        // el horario pedido esta tomado y ademas llega demasiado pronto:
        // tiene que ganar el conflicto de franja, que trae la sugerencia
        let (admission, orders, clock) = fixture();
        let now = clock.now();
        {
            let mut orders = orders.lock().expect("the lock should not be poisoned");
            let brewing = orders.insert(3, String::from("Juan"), None, now);
            assert!(orders.claim_for_brewing(brewing.id, now + Duration::seconds(300)));
            orders.insert(1, String::from("Luz"), Some(now + Duration::minutes(2)), now);
        }
        let rejection = admission
            .submit(reservation(1, now + Duration::minutes(2) + Duration::seconds(10)))
            .expect_err("it should be rejected");
        assert!(matches!(rejection, OrderRejection::SlotTaken { .. }));
    }

    #[test]
    fn should_keep_accepted_reservations_apart_from_each_other() {
        let (admission, _, clock) = fixture();
        let now = clock.now();
        let catalog = Catalog::default_menu();
        let attempts = vec![
            (1, now + Duration::minutes(60)),
            (1, now + Duration::minutes(60) + Duration::seconds(15)),
            (2, now + Duration::minutes(65)),
            (3, now + Duration::minutes(120)),
            (1, now + Duration::minutes(120) + Duration::seconds(10)),
            (1, now + Duration::minutes(125)),
        ];
        let mut accepted = Vec::new();
        for (coffee_id, pickup) in attempts {
            if let Ok(order) = admission.submit(reservation(coffee_id, pickup)) {
                accepted.push(order);
            }
        }
        assert!(accepted.len() >= 2);
        for first in &accepted {
            for second in &accepted {
                if first.id == second.id {
                    continue;
                }
                let first_pickup = first.pickup_time.expect("accepted reservations have a pickup");
                let second_pickup =
                    second.pickup_time.expect("accepted reservations have a pickup");
                let gap = (first_pickup - second_pickup).num_seconds().abs();
                let first_prep = catalog.preparation_seconds(first.coffee_id).unwrap_or(0);
                let second_prep = catalog.preparation_seconds(second.coffee_id).unwrap_or(0);
                let minimum_gap = i64::from(first_prep.min(second_prep)).max(30);
                assert!(
                    gap >= minimum_gap,
                    "reservations #{} and #{} are only {}s apart",
                    first.id,
                    second.id,
                    gap
                );
            }
        }
    }

    #[test]
    fn should_update_a_pending_order() {
        let (admission, _, _) = fixture();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        let request = UpdateOrderRequest {
            customer_name: Some(String::from("Juan")),
            ..UpdateOrderRequest::default()
        };
        let updated = admission.update(order.id, request).expect("the update should work");
        assert_eq!("Juan", updated.customer_name);
        assert_eq!(order.coffee_id, updated.coffee_id);
    }

    #[test]
    fn should_not_update_an_order_that_is_already_brewing() {
        let (admission, orders, clock) = fixture();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        {
            let mut orders = orders.lock().expect("the lock should not be poisoned");
            assert!(orders.claim_for_brewing(order.id, clock.now() + Duration::seconds(30)));
        }
        let request = UpdateOrderRequest {
            customer_name: Some(String::from("Juan")),
            ..UpdateOrderRequest::default()
        };
        let rejection = admission.update(order.id, request).expect_err("it should be rejected");
        assert_eq!(
            OrderRejection::NotPending {
                status: OrderStatus::Brewing
            },
            rejection
        );
    }

    #[test]
    fn should_delete_a_pending_order() {
        let (admission, orders, _) = fixture();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        admission.delete(order.id).expect("the delete should work");
        let orders = orders.lock().expect("the lock should not be poisoned");
        assert!(orders.get(order.id).is_none());
    }

    #[test]
    fn should_not_delete_an_order_that_is_not_pending() {
        let (admission, orders, clock) = fixture();
        let order = admission.submit(immediate(1)).expect("the order should be accepted");
        {
            let mut orders = orders.lock().expect("the lock should not be poisoned");
            assert!(orders.claim_for_brewing(order.id, clock.now() + Duration::seconds(30)));
        }
        let rejection = admission.delete(order.id).expect_err("it should be rejected");
        assert!(matches!(rejection, OrderRejection::NotPending { .. }));
    }

    #[test]
    fn should_not_update_an_unknown_order() {
        let (admission, _, _) = fixture();
        let rejection = admission
            .update(99, UpdateOrderRequest::default())
            .expect_err("it should be rejected");
        assert_eq!(OrderRejection::NotFound(99), rejection);
    }
}
