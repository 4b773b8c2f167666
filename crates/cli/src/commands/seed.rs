//! Database seeding command.
//!
//! Creates an admin account and a small demo catalog owned by it, so a
//! fresh install has something to sell.

use secrecy::SecretString;
use tracing::info;

use okra_api::db::{ProductInput, ProductRepository, create_pool};
use okra_api::services::{AuthError, AuthService};
use okra_core::Price;

/// Seed the database with a demo admin and catalog.
///
/// Idempotent on the admin: if the email is already registered, seeding
/// stops rather than duplicating the catalog.
///
/// # Errors
///
/// Returns an error if environment variables are missing or database
/// operations fail.
pub async fn run(email: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("OKRA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "OKRA_DATABASE_URL not set")?;

    let pool = create_pool(&database_url).await?;

    let auth = AuthService::new(&pool);
    let admin = match auth
        .register_admin(email, password, "Seed", "Admin", None)
        .await
    {
        Ok(admin) => admin,
        Err(AuthError::AlreadyExists) => {
            info!(email, "Admin already exists, nothing to seed");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(admin_id = %admin.id, "Created seed admin");

    let products = ProductRepository::new(&pool);
    for (name, description, quantity, price_minor, sizes, colors) in demo_catalog() {
        let input = ProductInput {
            name: name.to_owned(),
            description: description.to_owned(),
            quantity,
            price: Price::from_minor(price_minor)?,
            sizes: sizes.iter().map(|s| (*s).to_owned()).collect(),
            colors: colors.iter().map(|c| (*c).to_owned()).collect(),
            images: Vec::new(),
        };
        let product = products.create(admin.id, &input).await?;
        info!(product_id = %product.id, name, "Created seed product");
    }

    info!("Seeding complete!");
    Ok(())
}

type DemoProduct = (
    &'static str,
    &'static str,
    i32,
    i64,
    &'static [&'static str],
    &'static [&'static str],
);

fn demo_catalog() -> Vec<DemoProduct> {
    vec![
        (
            "Ankara Tote",
            "Hand-stitched tote in ankara print fabric.",
            25,
            850_000,
            &[][..],
            &["red", "indigo"][..],
        ),
        (
            "Linen Shirt",
            "Relaxed-fit linen shirt.",
            40,
            1_200_000,
            &["S", "M", "L", "XL"][..],
            &["white", "sand"][..],
        ),
        (
            "Woven Sandals",
            "Leather sandals with woven straps.",
            15,
            950_000,
            &["40", "41", "42", "43"][..],
            &["tan"][..],
        ),
    ]
}
