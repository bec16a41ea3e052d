use fastrack_core::storage::Database;

pub fn run_history(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let history = db.history(limit)?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

pub fn run_stats() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let stats = db.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
