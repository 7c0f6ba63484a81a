use std::env;
use std::thread;

use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use coffee_machine::catalog::Catalog;
use coffee_machine::orders_reader::read_and_submit_orders;
use coffee_machine::CoffeeMachine;

fn main() {
    if SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_utc_timestamps()
        .init()
        .is_err()
    {
        eprintln!("Could not start the logger");
    }

    let menu_path = env::args().nth(1).unwrap_or_else(|| String::from("menu.json"));
    let catalog = match Catalog::from_file(&menu_path) {
        Ok(catalog) => catalog,
        Err(error) => {
            warn!(
                "[MACHINE] Could not read the menu from {} ({:?}), using the default menu",
                menu_path, error
            );
            Catalog::default_menu()
        }
    };

    let mut machine = CoffeeMachine::new(catalog);
    machine.start();

    let admission = machine.admission();
    let reader_catalog = machine.catalog();
    let reader_clock = machine.clock();
    let orders_path = env::args().nth(2).unwrap_or_else(|| String::from("orders.json"));
    thread::spawn(move || {
        let result = read_and_submit_orders(
            &admission,
            &reader_catalog,
            reader_clock.as_ref(),
            &orders_path,
        );
        if let Err(error) = result {
            info!("[READER] No orders file to load ({:?})", error);
        }
    });

    let shutdown = machine.shutdown_handle();
    if let Err(error) = ctrlc::set_handler(move || {
        info!("[MACHINE] Shutdown requested, finishing the current order...");
        shutdown.shutdown();
    }) {
        error!("[MACHINE] Could not set the shutdown handler: {}", error);
    }

    machine.join();
}
