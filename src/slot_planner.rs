//! Calculos puros de planificacion de franjas horarias.
//! Ninguna funcion de este modulo tiene efectos ni toma locks: reciben el
//! instante actual y los pedidos que importan, y devuelven horarios.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::catalog::Catalog;
use crate::constants::{
    ADMISSION_GRID_MINUTES, CLOSE_HOUR, OPEN_HOUR, POST_CONFLICT_SPACING_SECONDS,
    SLOT_CANDIDATE_COUNT, SLOT_STEP_MINUTES,
};
use crate::order::Order;

/// Segundos que le faltan al pedido en preparacion, segun su estimacion.
/// Una estimacion vencida cuenta como cero.
pub fn remaining_brew_seconds(brewing: Option<&Order>, now: DateTime<Utc>) -> i64 {
    match brewing.and_then(|order| order.estimated_completion_time) {
        Some(estimated) => (estimated - now).num_seconds().max(0),
        None => 0,
    }
}

/// Suma de los tiempos de preparacion de los pedidos pendientes. Con un
/// horizonte, las reservas con retiro mas alla de el no suman.
pub fn queued_preparation_seconds(
    pending: &[Order],
    catalog: &Catalog,
    now: DateTime<Utc>,
    horizon: Option<Duration>,
) -> i64 {
    pending
        .iter()
        .filter(|order| match (order.pickup_time, horizon) {
            (Some(pickup), Some(horizon)) => pickup <= now + horizon,
            _ => true,
        })
        .map(|order| {
            catalog
                .preparation_seconds(order.coffee_id)
                .map_or(0, i64::from)
        })
        .sum()
}

/// Primer instante en el que un pedido nuevo podria estar listo: lo que le
/// falta al que se esta preparando, mas la cola pendiente, mas el pedido nuevo.
pub fn earliest_available(
    now: DateTime<Utc>,
    brewing: Option<&Order>,
    pending: &[Order],
    catalog: &Catalog,
    new_preparation_seconds: u32,
    horizon: Option<Duration>,
) -> DateTime<Utc> {
    let total = remaining_brew_seconds(brewing, now)
        + queued_preparation_seconds(pending, catalog, now, horizon)
        + i64::from(new_preparation_seconds);
    now + Duration::seconds(total)
}

/// Redondea hacia arriba al proximo multiplo de la grilla dentro de la hora,
/// descartando los segundos. El minuto 60 pasa a la hora siguiente.
/// `grid_minutes` tiene que ser un divisor positivo de 60.
pub fn round_up_to_grid(instant: DateTime<Utc>, grid_minutes: u32) -> DateTime<Utc> {
    let grid = i64::from(grid_minutes);
    let seconds_into_hour = instant.timestamp().rem_euclid(3600);
    let hour_start = instant
        - Duration::seconds(seconds_into_hour)
        - Duration::nanoseconds(i64::from(instant.timestamp_subsec_nanos()));
    let minute = seconds_into_hour / 60;
    let rounded_minute = (minute + grid - 1) / grid * grid;
    hour_start + Duration::minutes(rounded_minute)
}

/// Busca la primera reserva cuyo retiro caiga a menos de `buffer_seconds`
/// del horario pedido, con ambos extremos inclusive
pub fn find_overlap(
    requested: DateTime<Utc>,
    reservations: &[Order],
    buffer_seconds: i64,
) -> Option<&Order> {
    reservations.iter().find(|order| match order.pickup_time {
        Some(pickup) => (pickup - requested).num_seconds().abs() <= buffer_seconds,
        None => false,
    })
}

/// Franja que se le sugiere al cliente despues de un conflicto: el final de
/// la reserva que choca (o el horario pedido si es posterior) mas la
/// separacion post conflicto, redondeada a la grilla de admision
pub fn next_free_after_overlap(
    overlap_pickup: DateTime<Utc>,
    overlap_preparation_seconds: u32,
    requested: DateTime<Utc>,
) -> DateTime<Utc> {
    let overlap_end = overlap_pickup + Duration::seconds(i64::from(overlap_preparation_seconds));
    let spacing = Duration::seconds(POST_CONFLICT_SPACING_SECONDS);
    let proposal = if overlap_pickup == requested {
        overlap_end + spacing
    } else {
        overlap_end.max(requested) + spacing
    };
    round_up_to_grid(proposal, ADMISSION_GRID_MINUTES)
}

/// Secuencia finita de franjas candidatas: arranca en la base redondeada a la
/// grilla de admision y avanza de a un paso fijo, descartando las que caen
/// fuera del horario de atencion o pisan el retiro exacto de una reserva
#[derive(Clone)]
pub struct CandidateSlots {
    next_slot: DateTime<Utc>,
    remaining: u32,
    reserved: Vec<DateTime<Utc>>,
}

/// Arma la secuencia de candidatas a partir de la base y de los retiros
/// ya reservados
pub fn candidate_slots(
    base: DateTime<Utc>,
    reserved_pickups: Vec<DateTime<Utc>>,
) -> CandidateSlots {
    CandidateSlots {
        next_slot: round_up_to_grid(base, ADMISSION_GRID_MINUTES),
        remaining: SLOT_CANDIDATE_COUNT,
        reserved: reserved_pickups,
    }
}

impl Iterator for CandidateSlots {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<DateTime<Utc>> {
        while self.remaining > 0 {
            let slot = self.next_slot;
            self.next_slot = slot + Duration::minutes(SLOT_STEP_MINUTES);
            self.remaining -= 1;
            let within_hours = slot.hour() >= OPEN_HOUR && slot.hour() < CLOSE_HOUR;
            if within_hours && !self.reserved.contains(&slot) {
                return Some(slot);
            }
        }
        None
    }
}
