//! Basic example demonstrating the Klocwork client.
//!
//! Log in with `kwauth` first, then run with:
//! ```
//! KLOCWORK_HOST=kwserver KLOCWORK_PORT=8080 cargo run --example basic
//! ```

use kwapi::{Server, ServerConfig};

#[tokio::main]
async fn main() -> kwapi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    let mut server = Server::new(ServerConfig::from_env()?)?;
    let version = server.version().await?.clone();
    println!("{server}, version {version}");

    println!("\n--- Projects ---");
    let names: Vec<String> = server
        .projects()
        .await?
        .iter()
        .map(|p| p.name.clone())
        .collect();
    for name in &names {
        println!("  - {name}");
    }

    let Some(first) = names.first() else {
        return Ok(());
    };
    let Some(project) = server.project(first).await? else {
        return Ok(());
    };

    println!("\n--- Builds of {} ---", project.name);
    for build in project.builds().await? {
        println!("  {build}");
    }

    println!("\n--- Views ---");
    for view in project.views().await? {
        println!("  {view}");
    }

    println!("\n--- New issues ---");
    let new = project.new_issues().await?;
    if !new.success {
        eprintln!("search failed: {:?}", new.error);
    }
    for issue in new.iter().take(10) {
        println!("  {issue}");
    }

    println!("\n--- Metric totals ---");
    for total in project.metrics_total(None, None).await?.iter() {
        println!("  {total}");
    }

    Ok(())
}
