//! Representacion de los pedidos que atiende la maquina

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type CoffeeId = u64;

/// Estados del ciclo de vida de un pedido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Brewing,
    Completed,
    Cancelled,
}

/// Un pedido de cafe. Si tiene horario de retiro es una reserva,
/// si no lo tiene es un pedido inmediato.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub coffee_id: CoffeeId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub progress: u8,
    pub pickup_time: Option<DateTime<Utc>>,
    pub estimated_completion_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        coffee_id: CoffeeId,
        customer_name: String,
        pickup_time: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Order {
        Order {
            id,
            coffee_id,
            customer_name,
            status: OrderStatus::Pending,
            progress: 0,
            pickup_time,
            estimated_completion_time: None,
            created_at,
        }
    }

    pub fn is_reservation(&self) -> bool {
        self.pickup_time.is_some()
    }
}
