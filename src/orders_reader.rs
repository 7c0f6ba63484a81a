//! Carga de una tanda inicial de pedidos desde un archivo JSON.
//! Los pedidos del archivo pasan por la admision como cualquier otro,
//! asi que pueden quedar rechazados.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::Duration;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::admission::{AdmissionController, SubmitOrderRequest};
use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::errors::CoffeeMachineError;

#[derive(Deserialize, Debug)]
struct JsonOrder {
    coffee: String,
    customer_name: Option<String>,
    pickup_in_seconds: Option<i64>,
}

#[derive(Deserialize)]
struct OrdersConfiguration {
    orders: Vec<JsonOrder>,
}

fn read_orders_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<JsonOrder>, CoffeeMachineError> {
    let file = File::open(path).map_err(|_| CoffeeMachineError::FileReaderError)?;
    let reader = BufReader::new(file);
    let orders_config: OrdersConfiguration =
        serde_json::from_reader(reader).map_err(|_| CoffeeMachineError::FileReaderError)?;
    Ok(orders_config.orders)
}

/// Lee los pedidos del archivo y los presenta a la admision. El retiro viene
/// como segundos relativos al momento de la carga, para que el mismo archivo
/// sirva en cualquier momento del dia.
pub fn read_and_submit_orders<P: AsRef<Path>>(
    admission: &AdmissionController,
    catalog: &Catalog,
    clock: &dyn Clock,
    path: P,
) -> Result<(), CoffeeMachineError> {
    let json_orders = read_orders_from_file(path)?;
    for json_order in json_orders {
        let coffee = match catalog.by_name(&json_order.coffee) {
            Some(coffee) => coffee,
            None => {
                warn!("[READER] Unknown coffee {:?} in the orders file", json_order.coffee);
                continue;
            }
        };
        let pickup_time = json_order
            .pickup_in_seconds
            .map(|seconds| clock.now() + Duration::seconds(seconds));
        let request = SubmitOrderRequest {
            coffee_id: coffee.id,
            customer_name: json_order.customer_name,
            pickup_time,
        };
        match admission.submit(request) {
            Ok(order) => debug!("[READER] Added order #{}", order.id),
            Err(rejection) => info!(
                "[READER] Order of {} was rejected: {:?}",
                json_order.coffee, rejection
            ),
        }
    }
    info!("[READER] No more orders left");
    Ok(())
}
