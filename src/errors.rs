use chrono::{DateTime, Utc};

use crate::order::{CoffeeId, Order, OrderId, OrderStatus};

/// Errores internos de la maquina.
#[derive(Debug)]
pub enum CoffeeMachineError {
    LockError,
    FileReaderError,
    InvalidMenu(String),
    UnknownCoffee(CoffeeId),
}

impl<T> From<std::sync::PoisonError<T>> for CoffeeMachineError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoffeeMachineError::LockError
    }
}

/// Motivos por los que la admision rechaza un pedido o una modificacion.
/// Llevan consigo lo que el cliente necesita para reintentar: el pedido que
/// bloquea, la franja sugerida o el primer horario disponible.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRejection {
    UnknownCoffee(CoffeeId),
    PickupTimeInPast,
    CustomerNameTooLong,
    MachineBusy {
        current_order: Order,
    },
    SlotTaken {
        suggested: DateTime<Utc>,
        overlapping: Order,
    },
    TooEarly {
        earliest: DateTime<Utc>,
    },
    NotPending {
        status: OrderStatus,
    },
    NotFound(OrderId),
    LockError,
}

impl<T> From<std::sync::PoisonError<T>> for OrderRejection {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        OrderRejection::LockError
    }
}
