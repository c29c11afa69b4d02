use std::process::exit;

use tracing::Level;

#[rocket::main]
async fn main() {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let rocket = match campus_backend::create(level).await {
        Ok(rocket) => rocket,
        Err(e) => {
            eprintln!("Unable to start server: {}", e);
            exit(1);
        }
    };

    if let Err(e) = rocket.launch().await {
        tracing::error!("Error launching server: {}", e);
        exit(1);
    }
}
