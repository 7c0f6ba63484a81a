//! Catalogo de cafes de la maquina. Se carga al arrancar y despues
//! se consulta de solo lectura, por eso se comparte sin lock.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PREPARATION_SECONDS;
use crate::errors::CoffeeMachineError;
use crate::order::CoffeeId;

/// Un cafe del menu, con su precio y su tiempo fijo de preparacion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coffee {
    pub id: CoffeeId,
    pub name: String,
    pub price: f64,
    pub preparation_seconds: u32,
}

#[derive(Deserialize)]
struct MenuFile {
    coffees: Vec<Coffee>,
}

/// Catalogo inmutable de cafes, indexado por id
pub struct Catalog {
    coffees: HashMap<CoffeeId, Coffee>,
}

impl Catalog {
    /// Crea el catalogo validando que los ids no se repitan y que los tiempos
    /// de preparacion esten dentro del rango aceptado.
    pub fn new(coffees: Vec<Coffee>) -> Result<Catalog, CoffeeMachineError> {
        let mut by_id = HashMap::new();
        for coffee in coffees {
            if coffee.preparation_seconds == 0
                || coffee.preparation_seconds > MAX_PREPARATION_SECONDS
            {
                return Err(CoffeeMachineError::InvalidMenu(format!(
                    "coffee {} has an out of range preparation time of {} seconds",
                    coffee.name, coffee.preparation_seconds
                )));
            }
            let id = coffee.id;
            if by_id.insert(id, coffee).is_some() {
                return Err(CoffeeMachineError::InvalidMenu(format!(
                    "duplicated coffee id {}",
                    id
                )));
            }
        }
        Ok(Catalog { coffees: by_id })
    }

    /// Menu de fabrica de la maquina
    pub fn default_menu() -> Catalog {
        let mut coffees = HashMap::new();
        coffees.insert(
            1,
            Coffee {
                id: 1,
                name: String::from("espresso"),
                price: 2.50,
                preparation_seconds: 30,
            },
        );
        coffees.insert(
            2,
            Coffee {
                id: 2,
                name: String::from("cappuccino"),
                price: 3.50,
                preparation_seconds: 60,
            },
        );
        coffees.insert(
            3,
            Coffee {
                id: 3,
                name: String::from("latte"),
                price: 4.00,
                preparation_seconds: 90,
            },
        );
        Catalog { coffees }
    }

    /// Lee el menu de un archivo JSON con el formato `{"coffees": [...]}`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Catalog, CoffeeMachineError> {
        let file = File::open(path).map_err(|_| CoffeeMachineError::FileReaderError)?;
        let reader = BufReader::new(file);
        let menu: MenuFile = serde_json::from_reader(reader)
            .map_err(|error| CoffeeMachineError::InvalidMenu(error.to_string()))?;
        Catalog::new(menu.coffees)
    }

    pub fn get(&self, id: CoffeeId) -> Option<&Coffee> {
        self.coffees.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Coffee> {
        self.coffees.values().find(|coffee| coffee.name == name)
    }

    /// Tiempo de preparacion del cafe, si existe en el menu
    pub fn preparation_seconds(&self, id: CoffeeId) -> Option<u32> {
        self.coffees.get(&id).map(|coffee| coffee.preparation_seconds)
    }

    /// Cafes del menu ordenados por id
    pub fn coffees(&self) -> Vec<Coffee> {
        let mut coffees: Vec<Coffee> = self.coffees.values().cloned().collect();
        coffees.sort_by_key(|coffee| coffee.id);
        coffees
    }
}
