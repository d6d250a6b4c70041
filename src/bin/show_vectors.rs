//! Simple utility to inspect stored nutrient vectors
//! Usage: cargo run --bin show_vectors -- [--json] [search term]

use std::path::PathBuf;

use serde::Serialize;

use nutribase::models::{FoodRecord, NutrientRecord, RegionRecord};

fn get_database_path() -> PathBuf {
    std::env::var("NUTRIBASE_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            path.push("nutribase.db");
            path
        })
}

#[derive(Serialize)]
struct Dump {
    nutrients: Vec<NutrientRecord>,
    foods: Vec<FoodRecord>,
    regions: Vec<RegionRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let as_json = args.iter().any(|a| a == "--json");
    let term = args.iter().skip(1).find(|a| *a != "--json");

    let db_path = get_database_path();
    eprintln!("Database: {}", db_path.display());

    let database = nutribase::db::Database::new(&db_path)?;

    let dump = database.with_conn(|conn| {
        let nutrients = NutrientRecord::list_all(conn)?;
        let foods = match term {
            Some(term) => FoodRecord::search(conn, term)?,
            None => FoodRecord::list_all(conn)?,
        };
        let regions = RegionRecord::list_all(conn)?;
        Ok(Dump {
            nutrients,
            foods,
            regions,
        })
    })?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("Nutrients ({}):", dump.nutrients.len());
    for nutrient in &dump.nutrients {
        println!("  [{}] {}", nutrient.name_id, nutrient.name);
    }

    println!("\nFoods ({}):", dump.foods.len());
    for food in &dump.foods {
        println!(
            "  {} ({}) - {}",
            food.food_id,
            food.source.as_str(),
            food.description
        );
        match food.nutrients.data.decode() {
            Ok(values) => println!("    {:?}", values),
            Err(_) => println!("    raw: {}", food.nutrients.data),
        }
    }

    println!("\nRegions ({}):", dump.regions.len());
    for region in &dump.regions {
        println!("  {} ({})", region.name, region.source);
        match region.limits.data.decode() {
            Ok(values) => println!("    {:?}", values),
            Err(_) => println!("    raw: {}", region.limits.data),
        }
    }

    Ok(())
}
