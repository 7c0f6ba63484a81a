//! Formas de respuesta para la capa de transporte. El transporte en si
//! queda afuera: aca viven las estructuras serializables y el mapeo de
//! cada rechazo al codigo de estado que le corresponde.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::OrderRejection;
use crate::order::Order;

/// Respuesta de un pedido aceptado
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub status_code: u16,
    pub message: String,
    pub order: Order,
}

impl AcceptedResponse {
    pub fn created(order: Order) -> AcceptedResponse {
        let message = if order.is_reservation() {
            String::from("Reservation accepted")
        } else {
            String::from("Order accepted")
        };
        AcceptedResponse {
            status_code: 201,
            message,
            order,
        }
    }
}

/// Cuerpo de un rechazo, con el codigo de estado sugerido y los datos
/// que el cliente necesita para reintentar
#[derive(Debug, Clone, Serialize)]
pub struct RejectionResponse {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlapping_reservation: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_available: Option<DateTime<Utc>>,
}

impl RejectionResponse {
    fn bare(status_code: u16, message: String) -> RejectionResponse {
        RejectionResponse {
            status_code,
            message,
            current_order: None,
            overlapping_reservation: None,
            earliest_available: None,
        }
    }
}

impl From<OrderRejection> for RejectionResponse {
    fn from(rejection: OrderRejection) -> RejectionResponse {
        match rejection {
            OrderRejection::UnknownCoffee(id) => RejectionResponse::bare(
                422,
                format!("There is no coffee with id {} in the menu", id),
            ),
            OrderRejection::PickupTimeInPast => {
                RejectionResponse::bare(422, String::from("The pickup time must be in the future"))
            }
            OrderRejection::CustomerNameTooLong => {
                RejectionResponse::bare(422, String::from("The customer name is too long"))
            }
            OrderRejection::MachineBusy { current_order } => RejectionResponse {
                current_order: Some(current_order),
                ..RejectionResponse::bare(
                    409,
                    String::from(
                        "An order is already in progress. Wait for it to finish or book a slot.",
                    ),
                )
            },
            OrderRejection::SlotTaken {
                suggested,
                overlapping,
            } => RejectionResponse {
                overlapping_reservation: Some(overlapping),
                earliest_available: Some(suggested),
                ..RejectionResponse::bare(
                    422,
                    format!(
                        "This slot is already taken. The next free slot starts at {}",
                        suggested.format("%H:%M")
                    ),
                )
            },
            OrderRejection::TooEarly { earliest } => RejectionResponse {
                earliest_available: Some(earliest),
                ..RejectionResponse::bare(
                    422,
                    format!(
                        "The machine cannot have it ready before {}",
                        earliest.format("%H:%M:%S")
                    ),
                )
            },
            OrderRejection::NotPending { status } => RejectionResponse::bare(
                400,
                format!("Only pending orders can be changed, this one is {:?}", status),
            ),
            OrderRejection::NotFound(id) => {
                RejectionResponse::bare(404, format!("There is no order with id {}", id))
            }
            OrderRejection::LockError => {
                RejectionResponse::bare(500, String::from("Internal error, try again"))
            }
        }
    }
}

#[cfg(test)]
mod api_tests {
    use chrono::TimeZone;

    use super::*;
    use crate::order::OrderStatus;

    fn some_order() -> Order {
        let created_at = Utc.with_ymd_and_hms(2025, 5, 12, 10, 0, 0).unwrap();
        Order::new(7, 1, String::from("Ana"), None, created_at)
    }

    #[test]
    fn should_map_a_busy_machine_to_a_conflict() {
        let response = RejectionResponse::from(OrderRejection::MachineBusy {
            current_order: some_order(),
        });
        assert_eq!(409, response.status_code);
        assert_eq!(Some(7), response.current_order.map(|order| order.id));
    }

    #[test]
    fn should_map_a_taken_slot_to_unprocessable_with_the_suggestion() {
        let suggested = Utc.with_ymd_and_hms(2025, 5, 12, 11, 15, 0).unwrap();
        let response = RejectionResponse::from(OrderRejection::SlotTaken {
            suggested,
            overlapping: some_order(),
        });
        assert_eq!(422, response.status_code);
        assert_eq!(Some(suggested), response.earliest_available);
        assert!(response.overlapping_reservation.is_some());
    }

    #[test]
    fn should_map_a_missing_order_to_not_found() {
        let response = RejectionResponse::from(OrderRejection::NotFound(99));
        assert_eq!(404, response.status_code);
    }

    #[test]
    fn should_map_a_not_pending_order_to_a_bad_request() {
        let response = RejectionResponse::from(OrderRejection::NotPending {
            status: OrderStatus::Brewing,
        });
        assert_eq!(400, response.status_code);
    }

    #[test]
    fn should_announce_a_reservation_in_the_created_response() {
        let created_at = Utc.with_ymd_and_hms(2025, 5, 12, 10, 0, 0).unwrap();
        let pickup = Utc.with_ymd_and_hms(2025, 5, 12, 11, 0, 0).unwrap();
        let order = Order::new(1, 1, String::from("Ana"), Some(pickup), created_at);
        let response = AcceptedResponse::created(order);
        assert_eq!(201, response.status_code);
        assert_eq!("Reservation accepted", response.message);
    }
}
