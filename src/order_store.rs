//! Registro de pedidos que comparten la admision, los reportes y el worker.
//! Se comparte como `Arc<Mutex<OrderStore>>`: el mutex unico hace que cada
//! operacion sea una transaccion serializada sobre los pedidos, y las
//! operaciones de claim son del estilo comparar-y-cambiar para que el worker
//! nunca pise un cambio hecho desde afuera.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::order::{CoffeeId, Order, OrderId, OrderStatus};

pub struct OrderStore {
    orders: BTreeMap<OrderId, Order>,
    next_id: OrderId,
}

impl OrderStore {
    pub fn new() -> OrderStore {
        OrderStore {
            orders: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Da de alta un pedido pendiente con el proximo id y lo devuelve
    pub fn insert(
        &mut self,
        coffee_id: CoffeeId,
        customer_name: String,
        pickup_time: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Order {
        let order = Order::new(self.next_id, coffee_id, customer_name, pickup_time, created_at);
        self.next_id += 1;
        self.orders.insert(order.id, order.clone());
        order
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Aplica una modificacion arbitraria y devuelve el pedido actualizado
    pub fn update<F: FnOnce(&mut Order)>(&mut self, id: OrderId, apply: F) -> Option<Order> {
        let order = self.orders.get_mut(&id)?;
        apply(order);
        Some(order.clone())
    }

    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id)
    }

    /// Todos los pedidos, por id
    pub fn orders(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    pub fn brewing_order(&self) -> Option<&Order> {
        self.orders
            .values()
            .find(|order| order.status == OrderStatus::Brewing)
    }

    /// Pedidos pendientes, por id
    pub fn pending_orders(&self) -> Vec<Order> {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending)
            .cloned()
            .collect()
    }

    /// Reservas pendientes, por id
    pub fn pending_reservations(&self) -> Vec<Order> {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending && order.is_reservation())
            .cloned()
            .collect()
    }

    pub fn pending_immediate_count(&self) -> usize {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending && !order.is_reservation())
            .count()
    }

    /// El pedido inmediato pendiente mas viejo, que es el proximo a preparar
    /// y el que bloquea la admision de otro inmediato
    pub fn oldest_pending_immediate(&self) -> Option<&Order> {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending && !order.is_reservation())
            .min_by_key(|order| (order.created_at, order.id))
    }

    /// Reserva pendiente con retiro dentro de la ventana, la de retiro
    /// mas proximo primero. Los limites son inclusivos.
    pub fn due_reservation(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Option<&Order> {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending)
            .filter(|order| match order.pickup_time {
                Some(pickup) => window_start <= pickup && pickup <= window_end,
                None => false,
            })
            .min_by_key(|order| (order.pickup_time, order.created_at, order.id))
    }

    /// Convierte en inmediatas las reservas pendientes con retiro anterior
    /// al corte y devuelve las convertidas
    pub fn convert_late_reservations(&mut self, cutoff: DateTime<Utc>) -> Vec<Order> {
        let mut converted = Vec::new();
        for order in self.orders.values_mut() {
            if order.status != OrderStatus::Pending {
                continue;
            }
            if let Some(pickup) = order.pickup_time {
                if pickup < cutoff {
                    order.pickup_time = None;
                    converted.push(order.clone());
                }
            }
        }
        converted
    }

    /// Proximas reservas pendientes por horario de retiro
    pub fn upcoming_reservations(&self, limit: usize) -> Vec<Order> {
        let mut reservations = self.pending_reservations();
        reservations.sort_by_key(|order| (order.pickup_time, order.id));
        reservations.truncate(limit);
        reservations
    }

    /// Cantidad de reservas pendientes con el retiro ya vencido
    pub fn overdue_reservation_count(&self, now: DateTime<Utc>) -> usize {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Pending)
            .filter(|order| match order.pickup_time {
                Some(pickup) => pickup < now,
                None => false,
            })
            .count()
    }

    /// La cola en el orden en que se va a atender: inmediatos primero por
    /// orden de llegada y despues las reservas por horario de retiro
    pub fn queue_in_service_order(&self) -> Vec<Order> {
        let mut queue = self.pending_orders();
        queue.sort_by_key(|order| {
            (order.is_reservation(), order.pickup_time, order.created_at, order.id)
        });
        queue
    }

    /// Marca el pedido como en preparacion solo si sigue pendiente y no hay
    /// ningun otro en preparacion. Devuelve si lo logro.
    pub fn claim_for_brewing(&mut self, id: OrderId, estimated_completion: DateTime<Utc>) -> bool {
        if self.brewing_order().is_some() {
            return false;
        }
        match self.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Brewing;
                order.progress = 0;
                order.estimated_completion_time = Some(estimated_completion);
                true
            }
            _ => false,
        }
    }

    /// Devuelve el pedido a pendiente solo si sigue en preparacion,
    /// sin pisar un cambio hecho desde afuera
    pub fn release_if_brewing(&mut self, id: OrderId) -> bool {
        match self.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Brewing => {
                order.status = OrderStatus::Pending;
                order.progress = 0;
                order.estimated_completion_time = None;
                true
            }
            _ => false,
        }
    }

    /// Completa el pedido solo si sigue en preparacion
    pub fn complete_if_brewing(&mut self, id: OrderId) -> bool {
        match self.orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Brewing => {
                order.status = OrderStatus::Completed;
                order.progress = 100;
                order.estimated_completion_time = None;
                true
            }
            _ => false,
        }
    }
}
