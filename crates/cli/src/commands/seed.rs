//! Seed the beverage catalog with demo data.
//!
//! Inserts a small catalog through the beverage store so a fresh database can
//! serve the cart flows immediately. Seeding is skipped when the catalog
//! already has rows, so the command is safe to run repeatedly.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use tracing::info;

use quench_storefront::db::{self, BeverageStore};
use quench_storefront::models::CreateBeverageInput;

/// Seed the beverage catalog.
///
/// # Errors
///
/// Returns an error if environment variables are missing or database
/// operations fail.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let database_url = std::env::var("QUENCH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "QUENCH_DATABASE_URL not set")?;

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM storefront.beverage")
        .fetch_one(&pool)
        .await?;

    if existing > 0 {
        info!(existing, "Beverage catalog already has rows; nothing to do");
        return Ok(());
    }

    let beverages = db::BeverageRepository::new(pool);
    let catalog = demo_catalog();

    info!(count = catalog.len(), "Seeding beverage catalog");

    let mut inserted = 0_usize;
    for input in catalog {
        let beverage = beverages.create(input).await?;
        info!(id = %beverage.id, name = %beverage.name, stock = beverage.stock, "Inserted beverage");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Beverages inserted: {inserted}");

    Ok(())
}

/// Demo catalog matching what the storefront expects: display name, brand,
/// unit price, opening stock, and a free-text volume.
fn demo_catalog() -> Vec<CreateBeverageInput> {
    let rows: [(&str, &str, Decimal, i32, &str); 8] = [
        ("Cola Classic", "Quench", dec!(2.50), 120, "330 ml can"),
        ("Cola Zero", "Quench", dec!(2.50), 96, "330 ml can"),
        ("Sparkling Water", "Alpine Springs", dec!(1.20), 200, "500 ml bottle"),
        ("Yuzu Soda", "Tokyo Pop", dec!(4.00), 48, "250 ml can"),
        ("Ginger Beer", "Old Harbour", dec!(3.10), 60, "275 ml bottle"),
        ("Cold Brew Coffee", "Night Owl", dec!(4.50), 36, "330 ml bottle"),
        ("Orange Juice", "Grove Fresh", dec!(3.80), 80, "1 l carton"),
        ("Elderflower Tonic", "Meadowsweet", dec!(2.90), 72, "200 ml bottle"),
    ];

    rows.into_iter()
        .map(|(name, brand_name, price, stock, volume)| CreateBeverageInput {
            name: name.to_owned(),
            brand_name: brand_name.to_owned(),
            price,
            stock,
            volume: volume.to_owned(),
            image_url: None,
        })
        .collect()
}
